use axum::extract::State;

use crate::middleware::{ApiResponse, ApiResult, JsonBody};
use crate::services::users::{LoginRequest, Session, SignupRequest};
use crate::services::UserService;
use crate::state::SharedState;

/// POST /users/signup - Register and receive a session token
///
/// Emails on the premium list get the premium plan; the list entry is consumed.
pub async fn signup(State(state): State<SharedState>, JsonBody(body): JsonBody<SignupRequest>) -> ApiResult<Session> {
    let session = UserService::new(&state).signup(body).await?;
    Ok(ApiResponse::created(session).message("User registered successfully"))
}

/// POST /users/login and /users/signin
pub async fn login(State(state): State<SharedState>, JsonBody(body): JsonBody<LoginRequest>) -> ApiResult<Session> {
    let session = UserService::new(&state).login(body).await?;
    Ok(ApiResponse::success(session).message("Logged in successfully"))
}
