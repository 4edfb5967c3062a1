// Callbacks from the document converter. They address a media record by its
// `_id`, sent as `fileId`.

use axum::{extract::State, http::HeaderMap};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::database::models::{ConversionStatus, Media};
use crate::error::ApiError;
use crate::middleware::{required, required_id, ApiResponse, ApiResult, JsonBody};
use crate::services::MediaService;
use crate::state::SharedState;

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionUpdate {
    pub file_id: Option<String>,
    pub conversion_status: Option<String>,
    pub key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatusUpdate {
    pub file_id: Option<String>,
    pub status: Option<String>,
}

fn check_secret(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    match headers.get(WEBHOOK_SECRET_HEADER).and_then(|v| v.to_str().ok()) {
        Some(given) if secrets_match(given, expected) => Ok(()),
        _ => Err(ApiError::unauthorized("Invalid webhook secret")),
    }
}

/// Compares digests so neither the content nor the length of the secret leaks through timing
fn secrets_match(given: &str, expected: &str) -> bool {
    let given = Sha256::digest(given.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    given.as_slice().ct_eq(expected.as_slice()).into()
}

fn parse_status(raw: &str, field: &str) -> Result<ConversionStatus, ApiError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pending" => Ok(ConversionStatus::Pending),
        "converted" | "completed" | "success" => Ok(ConversionStatus::Converted),
        "failed" | "error" => Ok(ConversionStatus::Failed),
        _ => Err(ApiError::field(field, format!("Invalid {}", field))),
    }
}

/// POST /contract/conversion-status - Converter finished (or failed) a file
pub async fn conversion_status(
    State(state): State<SharedState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<ConversionUpdate>,
) -> ApiResult<Media> {
    check_secret(&headers, state.policy.webhook_secret.as_deref())?;
    let file_id = required_id(&body.file_id, "fileId", "Please provide fileId")?;
    let status = parse_status(
        required(&body.conversion_status, "conversionStatus", "Please provide conversionStatus")?,
        "conversionStatus",
    )?;
    let key = body.key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());

    let media = MediaService::new(&state).update_conversion(file_id, status, key).await?;
    tracing::info!(file = %media.id, status = ?media.conversion_status, "Conversion status updated");
    Ok(ApiResponse::success(media).message("Conversion status updated successfully"))
}

/// POST /contract/file-status - Status-only update for a file
pub async fn file_status(
    State(state): State<SharedState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<FileStatusUpdate>,
) -> ApiResult<Media> {
    check_secret(&headers, state.policy.webhook_secret.as_deref())?;
    let file_id = required_id(&body.file_id, "fileId", "Please provide fileId")?;
    let status = parse_status(required(&body.status, "status", "Please provide status")?, "status")?;

    let media = MediaService::new(&state).update_conversion(file_id, status, None).await?;
    Ok(ApiResponse::success(media).message("File status updated successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converter_statuses_are_mapped() {
        assert_eq!(parse_status("Converted", "status").unwrap(), ConversionStatus::Converted);
        assert_eq!(parse_status("error", "status").unwrap(), ConversionStatus::Failed);
        assert_eq!(parse_status("pending", "status").unwrap(), ConversionStatus::Pending);
        assert_eq!(parse_status("melted", "status").unwrap_err().message(), "Invalid status");
    }

    #[test]
    fn secret_header_is_checked_only_when_configured() {
        let mut headers = HeaderMap::new();
        assert!(check_secret(&headers, None).is_ok());
        assert_eq!(check_secret(&headers, Some("s3cret")).unwrap_err().status_code(), 401);

        headers.insert(WEBHOOK_SECRET_HEADER, "s3cre".parse().unwrap());
        assert!(check_secret(&headers, Some("s3cret")).is_err());
        headers.insert(WEBHOOK_SECRET_HEADER, "s3cret".parse().unwrap());
        assert!(check_secret(&headers, Some("s3cret")).is_ok());
    }
}
