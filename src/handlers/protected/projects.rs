use axum::extract::{Path, State};
use serde::Deserialize;

use crate::database::models::Project;
use crate::middleware::{parse_id, required, ApiResponse, ApiResult, JsonBody, UserPrincipal};
use crate::services::ProjectService;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRequest {
    pub proj_name: Option<String>,
}

/// POST /users/projects
pub async fn create(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<ProjectRequest>,
) -> ApiResult<Project> {
    let name = required(&body.proj_name, "projName", "Please provide projName")?;
    let project = ProjectService::new(&state).create_project(user.id, name).await?;
    Ok(ApiResponse::created(project).message("Project created successfully"))
}

/// GET /users/projects - Active projects owned by the caller, newest first
pub async fn list(State(state): State<SharedState>, UserPrincipal(user): UserPrincipal) -> ApiResult<Vec<Project>> {
    let projects = ProjectService::new(&state).find_all_by_owner(user.id).await?;
    Ok(ApiResponse::success(projects).message("User Projects"))
}

/// GET /users/projects/:id
pub async fn get(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(id): Path<String>,
) -> ApiResult<Project> {
    let id = parse_id(&id, "projectId")?;
    let project = ProjectService::new(&state).get_project_404(user.id, id).await?;
    Ok(ApiResponse::success(project).message("Project fetched successfully"))
}

/// PUT /users/projects/:id
pub async fn rename(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<ProjectRequest>,
) -> ApiResult<Project> {
    let id = parse_id(&id, "projectId")?;
    let name = required(&body.proj_name, "projName", "Please provide projName")?;
    let project = ProjectService::new(&state).rename_project(user.id, id, name).await?;
    Ok(ApiResponse::success(project).message("Project updated successfully"))
}

/// DELETE /users/projects/:id - Soft delete
pub async fn remove(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(id): Path<String>,
) -> ApiResult<Project> {
    let id = parse_id(&id, "projectId")?;
    let project = ProjectService::new(&state).remove_project(user.id, id).await?;
    Ok(ApiResponse::success(project).message("Project removed successfully"))
}
