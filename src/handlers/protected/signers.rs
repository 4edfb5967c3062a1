use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::Value;

use crate::database::models::Contract;
use crate::error::ApiError;
use crate::middleware::{
    optional_id, required, required_id, ApiResponse, ApiResult, CurrentUser, JsonBody, UserPrincipal,
};
use crate::services::signers::{EmailReport, MemberInput, RemoveInput, SignatureView, TypedSignature};
use crate::services::SignerService;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub contract_id: Option<String>,
    #[serde(default)]
    pub add_members: Vec<MemberInput>,
    #[serde(default)]
    pub remove_members: Vec<RemoveInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignImageRequest {
    pub image: Option<String>,
    pub signature_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleSignerRequest {
    pub contract_id: Option<String>,
    pub enable_single_user: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct SignersQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub contract_id: Option<String>,
    pub email_sub: Option<String>,
    pub email_msg: Option<String>,
    pub expiry: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub contract_id: Option<String>,
    pub signature_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreeRequest {
    pub contract_id: Option<String>,
    pub agree: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclineRequest {
    pub contract_id: Option<String>,
}

fn contract_id(value: &Option<String>) -> Result<uuid::Uuid, ApiError> {
    required_id(value, "contractId", "Please provide contractId")
}

/// POST /signs/invite-signers - Every addition is validated before anything is written
pub async fn invite(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<InviteRequest>,
) -> ApiResult<Vec<Value>> {
    let contract_id = contract_id(&body.contract_id)?;
    let signers = SignerService::new(&state)
        .invite_signers(&user, contract_id, &body.add_members, &body.remove_members)
        .await?;
    Ok(ApiResponse::success(signers).message("Contract signers updated successfully"))
}

/// GET /signs/all - The caller's saved signatures
pub async fn signatures(State(state): State<SharedState>, UserPrincipal(user): UserPrincipal) -> ApiResult<Vec<SignatureView>> {
    let signatures = SignerService::new(&state).list_signatures(user.id).await?;
    Ok(ApiResponse::success(signatures).message("Signature listed"))
}

/// POST /signs/add-sign - Typed signature
pub async fn add_sign(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<TypedSignature>,
) -> ApiResult<SignatureView> {
    let signature_id = optional_id(&body.signature_id, "signatureId")?;
    let signature = SignerService::new(&state)
        .add_typed_signature(user.id, signature_id, body)
        .await?;
    Ok(ApiResponse::success(signature).message("Signature font has been added successfully"))
}

/// POST /signs/sign-image - Drawn signature sent as a data URL
pub async fn sign_image(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<SignImageRequest>,
) -> ApiResult<SignatureView> {
    let image = required(&body.image, "image", "Please provide image")?;
    let signature_id = optional_id(&body.signature_id, "signatureId")?;
    let signature = SignerService::new(&state)
        .add_drawn_signature(user.id, signature_id, image)
        .await?;
    Ok(ApiResponse::success(signature).message("Signature font has been added successfully"))
}

/// POST /signs/single-signer
pub async fn single_signer(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<SingleSignerRequest>,
) -> ApiResult<Contract> {
    let contract_id = contract_id(&body.contract_id)?;
    let enabled = body
        .enable_single_user
        .ok_or_else(|| ApiError::field("enableSingleUser", "Please provide enableSingleUser"))?;
    let contract = SignerService::new(&state)
        .set_single_signer(user.id, contract_id, enabled)
        .await?;
    Ok(ApiResponse::success(contract).message("Contract has been updated successfully"))
}

/// GET /signs/signers?id=
pub async fn members(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Query(query): Query<SignersQuery>,
) -> ApiResult<Vec<Value>> {
    let contract_id = required_id(&query.id, "id", "Please provide id")?;
    let signers = SignerService::new(&state).members(user.id, contract_id).await?;
    Ok(ApiResponse::success(signers).message("Members listed"))
}

/// POST /signs/email-notification - Invite every signer not yet emailed
pub async fn email_notification(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<NotificationRequest>,
) -> ApiResult<EmailReport> {
    let contract_id = contract_id(&body.contract_id)?;
    let subject = required(&body.email_sub, "emailSub", "Please provide emailSub")?;
    let report = SignerService::new(&state)
        .send_invitations(&user, contract_id, subject, body.email_msg.as_deref(), body.expiry)
        .await?;
    Ok(ApiResponse::success(report).message("Email Notification Sent"))
}

/// POST /signs/submitted
pub async fn submitted(
    State(state): State<SharedState>,
    current: CurrentUser,
    JsonBody(body): JsonBody<SubmitRequest>,
) -> ApiResult<Value> {
    let contract_id = contract_id(&body.contract_id)?;
    let signature_id = optional_id(&body.signature_id, "signatureId")?;
    let signer = SignerService::new(&state).submit(&current, contract_id, signature_id).await?;
    Ok(ApiResponse::success(signer).message("Document Signed successfully"))
}

/// POST /signs/agree
pub async fn agree(
    State(state): State<SharedState>,
    current: CurrentUser,
    JsonBody(body): JsonBody<AgreeRequest>,
) -> ApiResult<Value> {
    let contract_id = contract_id(&body.contract_id)?;
    let signer = SignerService::new(&state)
        .agree(&current, contract_id, body.agree.unwrap_or(true))
        .await?;
    Ok(ApiResponse::success(signer).message("Signer agreed to sign the contract"))
}

/// POST /signs/declined
pub async fn declined(
    State(state): State<SharedState>,
    current: CurrentUser,
    JsonBody(body): JsonBody<DeclineRequest>,
) -> ApiResult<Value> {
    let contract_id = contract_id(&body.contract_id)?;
    let signer = SignerService::new(&state).decline(&current, contract_id).await?;
    Ok(ApiResponse::success(signer).message("Signer declined to sign the contract"))
}
