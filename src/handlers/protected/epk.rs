use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::{Epk, EpkMember};
use crate::middleware::{parse_id, required_id, ApiResponse, ApiResult, JsonBody, UserPrincipal};
use crate::services::epk::{CreateEpk, EpkOverview, UpdateEpk};
use crate::services::signers::{EmailReport, MemberInput, RemoveInput};
use crate::services::EpkService;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRequest {
    pub epk_id: Option<String>,
    #[serde(default)]
    pub add_members: Vec<MemberInput>,
    #[serde(default)]
    pub remove_members: Vec<RemoveInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub epk_id: Option<String>,
    pub email_sub: Option<String>,
    pub email_msg: Option<String>,
}

/// POST /epk/create
pub async fn create(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<CreateEpk>,
) -> ApiResult<Epk> {
    let epk = EpkService::new(&state).create_epk(user.id, body).await?;
    Ok(ApiResponse::created(epk).message("Epk created successfully"))
}

/// GET /epk - Owned EPKs and EPKs the caller was added to
pub async fn list(State(state): State<SharedState>, UserPrincipal(user): UserPrincipal) -> ApiResult<Vec<EpkOverview>> {
    let epks = EpkService::new(&state).get_all(&user).await?;
    Ok(ApiResponse::success(epks).message("Epk listed"))
}

/// GET /epk/single/:id
pub async fn get(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(id): Path<String>,
) -> ApiResult<EpkOverview> {
    let id = parse_id(&id, "epkId")?;
    let service = EpkService::new(&state);
    let (epk, _) = service.check_access(&user, id).await?;
    let overview = service.overview(epk).await?;
    Ok(ApiResponse::success(overview).message("Epk fetched successfully"))
}

/// PUT /epk/:id
pub async fn update(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateEpk>,
) -> ApiResult<Epk> {
    let id = parse_id(&id, "epkId")?;
    let epk = EpkService::new(&state).update_epk(&user, id, body).await?;
    Ok(ApiResponse::success(epk).message("Epk updated successfully"))
}

/// DELETE /epk/:id - Removes the EPK with its members, templates and previews
pub async fn remove(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_id(&id, "epkId")?;
    let deleted = EpkService::new(&state).delete_epk(&user, id).await?;
    Ok(ApiResponse::success(json!({ "deleted": deleted })).message("Epk deleted successfully"))
}

/// POST /epk/create-team
pub async fn update_team(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<TeamRequest>,
) -> ApiResult<Vec<EpkMember>> {
    let epk_id = required_id(&body.epk_id, "epkId", "Please provide epkId")?;
    let members = EpkService::new(&state)
        .update_team(&user, epk_id, &body.add_members, &body.remove_members)
        .await?;
    Ok(ApiResponse::created(members).message("Epk team updated successfully"))
}

/// GET /epk/members/:epkId
pub async fn members(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(epk_id): Path<String>,
) -> ApiResult<Vec<EpkMember>> {
    let epk_id = parse_id(&epk_id, "epkId")?;
    let members = EpkService::new(&state).members(&user, epk_id).await?;
    Ok(ApiResponse::success(members).message("Members listed"))
}

/// POST /epk/email-notification
pub async fn email_notification(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<NotificationRequest>,
) -> ApiResult<EmailReport> {
    let epk_id = required_id(&body.epk_id, "epkId", "Please provide epkId")?;
    let report = EpkService::new(&state)
        .send_invitations(&user, epk_id, body.email_sub.as_deref(), body.email_msg.as_deref())
        .await?;
    Ok(ApiResponse::success(report).message("Email Notification Sent"))
}
