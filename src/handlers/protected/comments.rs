use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::database::models::Comment;
use crate::middleware::{required, ApiResponse, ApiResult, JsonBody, UserPrincipal};
use crate::services::comments::{parse_comment_type, CommentNode, CreateComment};
use crate::services::CommentService;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsQuery {
    #[serde(rename = "type")]
    pub comment_type: Option<String>,
    pub app_id: Option<String>,
}

/// POST /comment/create
pub async fn create(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<CreateComment>,
) -> ApiResult<Comment> {
    let comment = CommentService::new(&state).create(&user, body).await?;
    Ok(ApiResponse::success(comment).message("Comment created successfully"))
}

/// GET /comments/:screenId?type=&appId= - Threaded, replies nested under parents
pub async fn list(
    State(state): State<SharedState>,
    UserPrincipal(_user): UserPrincipal,
    Path(screen_id): Path<String>,
    Query(query): Query<CommentsQuery>,
) -> ApiResult<Vec<CommentNode>> {
    let comment_type = parse_comment_type(query.comment_type.as_deref())?;
    let app_id = required(&query.app_id, "appId", "Please provide appId")?;
    let comments = CommentService::new(&state).list(screen_id.trim(), comment_type, app_id).await?;
    Ok(ApiResponse::success(comments).message("Comments fetched successfully"))
}
