use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde_json::json;
use uuid::Uuid;

use crate::auth::{validate_jwt, TokenKind};
use crate::database::models::{Signer, User};
use crate::database::Repository;
use crate::error::ApiError;
use crate::state::SharedState;
use crate::types::ACTIVE;

/// Caller context inserted by `require_auth`
#[derive(Clone, Debug)]
pub struct CurrentUser {
    /// User id, or signer id for signer sessions
    pub id: Uuid,
    pub email: String,
    pub kind: TokenKind,
    /// Contract a signer session is scoped to
    pub contract_id: Option<Uuid>,
    /// Loaded account for user sessions
    pub user: Option<User>,
}

impl CurrentUser {
    pub fn is_signer(&self) -> bool {
        self.kind == TokenKind::Signer
    }
}

/// A logged-in account; signer sessions are rejected with 403
#[derive(Clone, Debug)]
pub struct UserPrincipal(pub User);

/// Validates the session token and loads the account or signer behind it
pub async fn require_auth(
    State(state): State<SharedState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())?;
    let claims = validate_jwt(&token)?;

    let current = match claims.kind {
        TokenKind::User => {
            let user = Repository::<User>::new(state.store.clone())
                .select_one(json!({ "_id": claims.sub, "status": ACTIVE }))
                .await?
                .ok_or_else(|| ApiError::unauthorized("User not found for this token"))?;
            CurrentUser {
                id: user.id,
                email: user.email.clone(),
                kind: TokenKind::User,
                contract_id: None,
                user: Some(user),
            }
        }
        TokenKind::Signer => {
            let contract_id = claims
                .contract_id
                .ok_or_else(|| ApiError::unauthorized("Invalid token"))?;
            let signer = Repository::<Signer>::new(state.store.clone())
                .select_one(json!({ "_id": claims.sub, "contractId": contract_id, "status": ACTIVE }))
                .await?
                .ok_or_else(|| ApiError::unauthorized("Signer is no longer part of this contract"))?;
            CurrentUser {
                id: signer.id,
                email: signer.email,
                kind: TokenKind::Signer,
                contract_id: Some(contract_id),
                user: None,
            }
        }
        TokenKind::Invite => {
            return Err(ApiError::unauthorized("Invitation links must be verified before use"));
        }
    };

    tracing::debug!(caller = %current.id, kind = ?current.kind, "Authenticated request");
    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

/// Accepts `Authorization: Bearer <token>` or the bare token
fn extract_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str).trim();
    if token.is_empty() {
        return Err(ApiError::unauthorized("Empty token"));
    }
    Ok(token.to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for UserPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;
        current
            .user
            .map(UserPrincipal)
            .ok_or_else(|| ApiError::forbidden("This action requires a user account"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_prefix_is_optional() {
        assert_eq!(extract_token(&headers("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(extract_token(&headers("abc.def")).unwrap(), "abc.def");
    }

    #[test]
    fn missing_or_empty_tokens_are_unauthorized() {
        assert_eq!(extract_token(&HeaderMap::new()).unwrap_err().status_code(), 401);
        assert_eq!(extract_token(&headers("Bearer ")).unwrap_err().status_code(), 401);
    }
}
