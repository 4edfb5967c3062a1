use axum::extract::{multipart::MultipartRejection, Multipart, Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::handlers::upload::read_upload;
use crate::middleware::{optional_id, parse_id, ApiResponse, ApiResult, UserPrincipal};
use crate::services::media::MediaView;
use crate::services::{ContractService, MediaService};
use crate::state::SharedState;

pub const DEFAULT_MEDIA_TYPE: &str = "general";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaQuery {
    pub contract_id: Option<String>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
}

/// POST /media/upload - multipart `file` parts with optional `contractId` and `type`
pub async fn upload(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Vec<MediaView>> {
    let form = read_upload(multipart, state.policy.max_upload_bytes).await?;
    let contract_id = optional_id(&form.field("contractId"), "contractId")?;
    if let Some(contract_id) = contract_id {
        ContractService::new(&state).get_owned(user.id, contract_id).await?;
    }
    let media_type = form.field("type").unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string());

    let files = MediaService::new(&state)
        .upload(user.id, form.files, contract_id, &media_type)
        .await?;
    Ok(ApiResponse::created(files).message("Files uploaded successfully"))
}

/// GET /media/all?contractId=&type=
pub async fn list(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Query(query): Query<MediaQuery>,
) -> ApiResult<Vec<MediaView>> {
    let contract_id = optional_id(&query.contract_id, "contractId")?;
    let media_type = query.media_type.as_deref().map(str::trim).filter(|t| !t.is_empty());

    let media = MediaService::new(&state);
    let files = media.get_all(user.id, contract_id, media_type).await?;
    Ok(ApiResponse::success(media.with_urls(files).await).message("Files listed"))
}

/// GET /media/:id
pub async fn get(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(id): Path<String>,
) -> ApiResult<MediaView> {
    let id = parse_id(&id, "id")?;
    let media = MediaService::new(&state);
    let file = media.get_owned_file(user.id, id).await?;
    Ok(ApiResponse::success(media.with_url(file).await).message("File fetched successfully"))
}

/// DELETE /media/:id - Removes the stored object and the record
pub async fn remove(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "id")?;
    let media = MediaService::new(&state);
    let file = media.get_owned_file(user.id, id).await?;
    let deleted = media.delete_file(&file).await?;
    Ok(ApiResponse::success(json!({ "deleted": deleted, "_id": file.id })).message("File deleted successfully"))
}
