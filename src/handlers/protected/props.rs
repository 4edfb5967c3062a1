use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::database::models::{Prop, PropMember};
use crate::middleware::{parse_id, required_id, ApiResponse, ApiResult, JsonBody, UserPrincipal};
use crate::services::props::{PropInput, PropsQuery};
use crate::services::signers::{MemberInput, RemoveInput};
use crate::services::PropService;
use crate::state::SharedState;
use crate::types::Paged;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub prop_id: Option<String>,
    #[serde(default)]
    pub add_members: Vec<MemberInput>,
    #[serde(default)]
    pub remove_members: Vec<RemoveInput>,
}

/// POST /props/create
pub async fn create(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<PropInput>,
) -> ApiResult<Prop> {
    let prop = PropService::new(&state).create(user.id, body).await?;
    Ok(ApiResponse::success(prop).message("Props created successfully"))
}

/// POST /props/update - Owner or member
pub async fn update(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<PropInput>,
) -> ApiResult<Prop> {
    let prop_id = required_id(&body.props_id, "propsId", "Please provide propsId")?;
    let prop = PropService::new(&state).update(&user, prop_id, &body).await?;
    Ok(ApiResponse::success(prop).message("Props updated successfully"))
}

/// POST /props?projectId=&limit=&page=&sort=&type=
pub async fn list(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Query(query): Query<PropsQuery>,
) -> ApiResult<Paged<Prop>> {
    let props = PropService::new(&state).list(&user, &query).await?;
    Ok(ApiResponse::success(props).message("Props listed"))
}

/// POST /props/:id
pub async fn get(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(id): Path<String>,
) -> ApiResult<Prop> {
    let id = parse_id(&id, "propsId")?;
    let (prop, _) = PropService::new(&state).check_access(&user, id).await?;
    Ok(ApiResponse::success(prop).message("Props fetched successfully"))
}

/// POST /props/remove/:id - Soft delete, owner only
pub async fn remove(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(id): Path<String>,
) -> ApiResult<Prop> {
    let id = parse_id(&id, "propsId")?;
    let prop = PropService::new(&state).remove(&user, id).await?;
    Ok(ApiResponse::success(prop).message("Props removed successfully"))
}

/// POST /props/invite
pub async fn invite(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<InviteRequest>,
) -> ApiResult<Vec<PropMember>> {
    let prop_id = required_id(&body.prop_id, "propId", "Please provide propId")?;
    let members = PropService::new(&state)
        .invite(&user, prop_id, &body.add_members, &body.remove_members)
        .await?;
    Ok(ApiResponse::success(members).message("Props team updated successfully"))
}

/// GET /props/list-members/:propId
pub async fn members(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(prop_id): Path<String>,
) -> ApiResult<Vec<PropMember>> {
    let prop_id = parse_id(&prop_id, "propId")?;
    let members = PropService::new(&state).members(&user, prop_id).await?;
    Ok(ApiResponse::success(members).message("Members listed"))
}
