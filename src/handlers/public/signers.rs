use axum::extract::State;
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::{required, ApiResponse, ApiResult, JsonBody};
use crate::services::signers::{decode_link_contract_id, SignerSession};
use crate::services::SignerService;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub token: Option<String>,
    pub contract_id: Option<String>,
}

/// POST /signs/verify - Exchange an emailed invitation for a signer session
///
/// Both values may be sent as they appear in the signing link (base64).
pub async fn verify(State(state): State<SharedState>, JsonBody(body): JsonBody<VerifyRequest>) -> ApiResult<SignerSession> {
    let token = required(&body.token, "token", "Please provide token")?;
    let raw_contract = required(&body.contract_id, "contractId", "Please provide contractId")?;
    let contract_id = decode_link_contract_id(raw_contract)
        .ok_or_else(|| ApiError::field("contractId", "Invalid contractId"))?;

    let session = SignerService::new(&state).verify(token, contract_id).await?;
    Ok(ApiResponse::success(session).message("User authenticated successfully"))
}
