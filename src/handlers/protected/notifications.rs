use axum::extract::{Path, Query, State};
use serde_json::{json, Value};

use crate::database::models::Notification;
use crate::middleware::{parse_id, ApiResponse, ApiResult, UserPrincipal};
use crate::services::notifications::NotificationPage;
use crate::services::NotificationService;
use crate::state::SharedState;
use crate::types::PageQuery;

/// GET /notification/listAllNotifications?page=&limit=
pub async fn list(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Query(query): Query<PageQuery>,
) -> ApiResult<NotificationPage> {
    let page = NotificationService::new(&state).list(user.id, &query).await?;
    Ok(ApiResponse::success(page).message("Notifications listed"))
}

/// GET /notification/update - Marks every notification of the caller as seen
pub async fn mark_seen(State(state): State<SharedState>, UserPrincipal(user): UserPrincipal) -> ApiResult<Value> {
    let updated = NotificationService::new(&state).mark_all_seen(user.id).await?;
    Ok(ApiResponse::success(json!({ "updated": updated })).message("Notifications updated successfully"))
}

/// GET /notification/count - Unseen and not deleted
pub async fn count(State(state): State<SharedState>, UserPrincipal(user): UserPrincipal) -> ApiResult<Value> {
    let count = NotificationService::new(&state).unseen_count(user.id).await?;
    Ok(ApiResponse::success(json!({ "count": count })).message("Notification count"))
}

/// DELETE /notification/:id
pub async fn remove(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(id): Path<String>,
) -> ApiResult<Notification> {
    let id = parse_id(&id, "id")?;
    let notification = NotificationService::new(&state).delete(user.id, id).await?;
    Ok(ApiResponse::success(notification).message("Notification deleted successfully"))
}
