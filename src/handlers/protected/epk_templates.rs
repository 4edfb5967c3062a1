use axum::extract::{Path, State};
use serde_json::{json, Value};

use crate::middleware::{parse_id, ApiResponse, ApiResult, JsonBody, UserPrincipal};
use crate::services::epk_templates::{SaveTemplate, TemplateView};
use crate::services::EpkTemplateService;
use crate::state::SharedState;

/// POST /epk-templates/add - Create, or update when `templateId` names an existing template
pub async fn save(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<SaveTemplate>,
) -> ApiResult<TemplateView> {
    let (template, created) = EpkTemplateService::new(&state).save(&user, body).await?;
    if created {
        Ok(ApiResponse::created(template).message("Template created successfully"))
    } else {
        Ok(ApiResponse::success(template).message("Template updated successfully"))
    }
}

/// GET /epk-templates/:epkId
pub async fn list(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(epk_id): Path<String>,
) -> ApiResult<Vec<TemplateView>> {
    let epk_id = parse_id(&epk_id, "epkId")?;
    let templates = EpkTemplateService::new(&state).list(&user, epk_id).await?;
    Ok(ApiResponse::success(templates).message("Templates fetched successfully"))
}

/// DELETE /epk-templates/:templateId
pub async fn remove(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(template_id): Path<String>,
) -> ApiResult<Value> {
    let template_id = parse_id(&template_id, "templateId")?;
    EpkTemplateService::new(&state).delete(&user, template_id).await?;
    Ok(ApiResponse::success(json!({ "_id": template_id })).message("Template deleted successfully"))
}
