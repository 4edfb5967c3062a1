// Serves stored objects for the memory and local backends, where media URLs
// point back at this API. Keys are unguessable, so no session is required.

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::SharedState;

/// GET /files/*key - Stream one object with its content type
pub async fn serve(State(state): State<SharedState>, Path(key): Path<String>) -> Result<Response, ApiError> {
    let object = state.storage.open(&key).await?;
    Ok((
        [
            (header::CONTENT_TYPE, object.content_type.to_string()),
            (header::CONTENT_LENGTH, object.size.to_string()),
        ],
        Body::from_stream(object.body),
    )
        .into_response())
}
