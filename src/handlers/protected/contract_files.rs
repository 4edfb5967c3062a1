// Contract documents and their signature field layouts

use axum::extract::{multipart::MultipartRejection, Multipart, Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::ContractFields;
use crate::handlers::upload::read_upload;
use crate::middleware::{
    optional_id, parse_id, required_id, ApiResponse, ApiResult, CurrentUser, JsonBody, UserPrincipal,
};
use crate::services::media::MediaView;
use crate::services::{ContractService, MediaService};
use crate::state::SharedState;

pub const CONTRACT_MEDIA_TYPE: &str = "contract";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractQuery {
    pub contract_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsRequest {
    pub contract_id: Option<String>,
    pub file_id: Option<String>,
    #[serde(default)]
    pub fields: Vec<Value>,
}

/// POST /contract/files/upload - multipart `contractId` plus one or more `file` parts
pub async fn upload(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Vec<MediaView>> {
    let form = read_upload(multipart, state.policy.max_upload_bytes).await?;
    let contract_id = required_id(&form.field("contractId"), "contractId", "Please provide contractId")?;
    let contract = ContractService::new(&state).get_owned(user.id, contract_id).await?;

    let files = MediaService::new(&state)
        .upload(user.id, form.files, Some(contract.id), CONTRACT_MEDIA_TYPE)
        .await?;
    Ok(ApiResponse::created(files).message("Files uploaded successfully"))
}

/// GET /contract/files?contractId= - Ordered by sequence
pub async fn list(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Query(query): Query<ContractQuery>,
) -> ApiResult<Vec<MediaView>> {
    let contract_id = required_id(&query.contract_id, "contractId", "Please provide contractId")?;
    let contract = ContractService::new(&state).get_owned(user.id, contract_id).await?;

    let media = MediaService::new(&state);
    let files = media.contract_files(contract.id).await?;
    Ok(ApiResponse::success(media.with_urls(files).await).message("Files listed"))
}

/// DELETE /contract/files/:fileId
pub async fn remove(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(file_id): Path<String>,
) -> ApiResult<Value> {
    let file_id = parse_id(&file_id, "fileId")?;
    let media = MediaService::new(&state);
    let file = media.get_owned_file(user.id, file_id).await?;
    let deleted = media.delete_file(&file).await?;
    Ok(ApiResponse::success(json!({ "deleted": deleted, "_id": file.id })).message("File deleted successfully"))
}

/// POST /contract/fields - Upsert the field layout for a contract or one of its files
pub async fn save_fields(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<FieldsRequest>,
) -> ApiResult<ContractFields> {
    let contract_id = required_id(&body.contract_id, "contractId", "Please provide contractId")?;
    let file_id = optional_id(&body.file_id, "fileId")?;
    let layout = ContractService::new(&state)
        .save_fields(user.id, contract_id, file_id, body.fields)
        .await?;
    Ok(ApiResponse::success(layout).message("Contract fields saved successfully"))
}

/// GET /contract/fields?contractId= - Readable by anyone who can view the contract
pub async fn list_fields(
    State(state): State<SharedState>,
    current: CurrentUser,
    Query(query): Query<ContractQuery>,
) -> ApiResult<Vec<ContractFields>> {
    let contract_id = required_id(&query.contract_id, "contractId", "Please provide contractId")?;
    let contracts = ContractService::new(&state);
    let contract = contracts.find_active(contract_id).await?;
    contracts.check_view_access(&current, &contract).await?;

    let fields = contracts.list_fields(contract.id).await?;
    Ok(ApiResponse::success(fields).message("Contract fields listed"))
}
