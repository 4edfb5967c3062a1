use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config;
use crate::handlers::{protected, public};
use crate::middleware::require_auth;
use crate::state::SharedState;

/// Full application router. Tests drive this directly with `oneshot`.
pub fn app(state: SharedState) -> Router {
    let max_upload_bytes = state.policy.max_upload_bytes;
    let protected = Router::new()
        .merge(user_routes())
        .merge(contract_routes())
        .merge(signer_routes())
        .merge(epk_routes())
        .merge(media_routes())
        .merge(props_routes())
        .merge(comment_routes())
        .merge(notification_routes())
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .merge(public_routes())
        // Protected API
        .merge(protected)
        .with_state(state)
        // Global middleware, outermost first
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer())
                .layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
}

fn cors_layer() -> CorsLayer {
    let origins = &config::config().security.cors_origins;
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| HeaderValue::from_str(o).ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn public_routes() -> Router<SharedState> {
    use public::{files, signers, users, webhooks};

    Router::new()
        // Sessions
        .route("/users/signup", post(users::signup))
        .route("/users/login", post(users::login))
        .route("/users/signin", post(users::login))
        // Emailed signing links
        .route("/signs/verify", post(signers::verify))
        // Document converter callbacks
        .route("/contract/conversion-status", post(webhooks::conversion_status))
        .route("/contract/file-status", post(webhooks::file_status))
        // Stored objects, for backends without presigned URLs
        .route("/files/*key", get(files::serve))
}

fn user_routes() -> Router<SharedState> {
    use protected::{projects, users};

    Router::new()
        .route("/users/profile", get(users::profile).put(users::update_profile))
        .route("/users/extend-session", get(users::extend_session))
        .route("/users/add-premium-user", post(users::add_premium_user))
        .route("/users/projects", get(projects::list).post(projects::create))
        .route(
            "/users/projects/:id",
            get(projects::get).put(projects::rename).delete(projects::remove),
        )
}

fn contract_routes() -> Router<SharedState> {
    use protected::{contract_files, contracts};

    Router::new()
        .route("/contract/create", get(contracts::create).post(contracts::create))
        .route("/contract/all", get(contracts::list).post(contracts::list))
        .route("/contract/update-name", post(contracts::update_name))
        .route("/contract/render-form", post(contracts::render_form))
        .route("/contract/discord-contract", post(contracts::discard))
        .route("/contract/view/:contractId", get(contracts::view))
        // Documents
        .route("/contract/files", get(contract_files::list))
        .route("/contract/files/upload", post(contract_files::upload))
        .route("/contract/files/:fileId", delete(contract_files::remove))
        .route("/contract/fields", get(contract_files::list_fields).post(contract_files::save_fields))
        .route("/contract/:id", get(contracts::get))
}

fn signer_routes() -> Router<SharedState> {
    use protected::signers;

    Router::new()
        .route("/signs/invite-signers", post(signers::invite))
        .route("/signs/all", get(signers::signatures))
        .route("/signs/add-sign", post(signers::add_sign))
        .route("/signs/sign-image", post(signers::sign_image))
        .route("/signs/single-signer", post(signers::single_signer))
        .route("/signs/signers", get(signers::members))
        .route("/signs/email-notification", post(signers::email_notification))
        .route("/signs/submitted", post(signers::submitted))
        .route("/signs/agree", post(signers::agree))
        .route("/signs/declined", post(signers::declined))
}

fn epk_routes() -> Router<SharedState> {
    use protected::{epk, epk_templates};

    Router::new()
        .route("/epk", get(epk::list))
        .route("/epk/create", post(epk::create))
        .route("/epk/single/:id", get(epk::get))
        .route("/epk/create-team", post(epk::update_team))
        .route("/epk/members/:epkId", get(epk::members))
        .route("/epk/email-notification", post(epk::email_notification))
        .route("/epk/:id", put(epk::update).delete(epk::remove))
        // Templates: GET takes an epk id, DELETE a template id
        .route("/epk-templates/add", post(epk_templates::save))
        .route("/epk-templates/:id", get(epk_templates::list).delete(epk_templates::remove))
}

fn media_routes() -> Router<SharedState> {
    use protected::media;

    Router::new()
        .route("/media/upload", post(media::upload))
        .route("/media/all", get(media::list))
        .route("/media/:id", get(media::get).delete(media::remove))
}

fn props_routes() -> Router<SharedState> {
    use protected::props;

    Router::new()
        .route("/props", post(props::list))
        .route("/props/create", post(props::create))
        .route("/props/update", post(props::update))
        .route("/props/invite", post(props::invite))
        .route("/props/remove/:id", post(props::remove))
        .route("/props/list-members/:propId", get(props::members))
        .route("/props/:id", post(props::get))
}

fn comment_routes() -> Router<SharedState> {
    use protected::comments;

    Router::new()
        .route("/comment/create", post(comments::create))
        .route("/comments/:screenId", get(comments::list))
}

fn notification_routes() -> Router<SharedState> {
    use protected::notifications;

    Router::new()
        .route("/notification/listAllNotifications", get(notifications::list))
        .route("/notification/update", get(notifications::mark_seen))
        .route("/notification/count", get(notifications::count))
        .route("/notification/:id", delete(notifications::remove))
}
