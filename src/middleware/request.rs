//! Request-side helpers shared by the handlers

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ApiError;

/// `Json<T>` whose rejections use the API error envelope
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(ApiError::invalid_json(rejection.body_text())),
        }
    }
}

/// Parse an id from a path, query or body; malformed ids are `400 Invalid <what>`
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::field(what, format!("Invalid {}", what)))
}

/// Trimmed, non-empty value of a required field
pub fn required<'a>(value: &'a Option<String>, field: &str, message: &str) -> Result<&'a str, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::field(field, message)),
    }
}

/// Required id field: missing is `message`, malformed is `Invalid <field>`
pub fn required_id(value: &Option<String>, field: &str, message: &str) -> Result<Uuid, ApiError> {
    parse_id(required(value, field, message)?, field)
}

/// Optional id field; blank counts as absent
pub fn optional_id(value: &Option<String>, field: &str) -> Result<Option<Uuid>, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => parse_id(v, field).map(Some),
        _ => Ok(None),
    }
}
