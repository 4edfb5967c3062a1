use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::database::models::{PremiumUser, Role, UserProfile};
use crate::error::ApiError;
use crate::middleware::{required, ApiResponse, ApiResult, JsonBody, UserPrincipal};
use crate::services::users::ProfileUpdate;
use crate::services::UserService;
use crate::state::SharedState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedSession {
    pub auth_key: String,
}

#[derive(Debug, Deserialize)]
pub struct PremiumRequest {
    pub email: Option<String>,
}

/// GET /users/profile
pub async fn profile(UserPrincipal(user): UserPrincipal) -> ApiResult<UserProfile> {
    Ok(ApiResponse::success(UserProfile::from(&user)).message("User profile"))
}

/// PUT /users/profile
pub async fn update_profile(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<ProfileUpdate>,
) -> ApiResult<UserProfile> {
    let profile = UserService::new(&state).update_profile(user.id, body).await?;
    Ok(ApiResponse::success(profile).message("Profile updated successfully"))
}

/// GET /users/extend-session - Fresh token for the current user
pub async fn extend_session(State(state): State<SharedState>, UserPrincipal(user): UserPrincipal) -> ApiResult<ExtendedSession> {
    let auth_key = UserService::new(&state).issue_token(&user)?;
    Ok(ApiResponse::success(ExtendedSession { auth_key }).message("Login session extended successfully"))
}

/// POST /users/add-premium-user - Admins only
pub async fn add_premium_user(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<PremiumRequest>,
) -> ApiResult<PremiumUser> {
    if user.role != Role::Admin {
        return Err(ApiError::forbidden("Only administrators can add premium users"));
    }
    let email = required(&body.email, "email", "Please provide email")?;

    let premium = UserService::new(&state).create_premium_user(email, Some(user.id)).await?;
    Ok(ApiResponse::created(premium).message("Premium user added successfully"))
}
