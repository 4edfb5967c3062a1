// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Middleware: CORS and request tracing only
//
// Signup/login hand out user sessions; /signs/verify exchanges an emailed
// invitation for a signer session; the conversion webhooks are called by the
// document converter and may be guarded by a shared secret header. Stored
// files are served under /files for backends without presigned URLs.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::state::SharedState;

pub mod files;
pub mod signers;
pub mod users;
pub mod webhooks;

/// GET / - Service description
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Cinea API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Film production workspace: projects, contracts and e-signatures, EPKs, media, props",
            "endpoints": {
                "users": "/users/signup, /users/login (public); /users/profile, /users/projects (protected)",
                "contracts": "/contract/* (protected), /contract/conversion-status (webhook)",
                "signers": "/signs/verify (public), /signs/* (protected)",
                "epk": "/epk/*, /epk-templates/* (protected)",
                "media": "/media/* (protected)",
                "props": "/props/* (protected)",
                "comments": "/comment/create, /comments/:screenId (protected)",
                "notifications": "/notification/* (protected)",
            }
        }
    }))
}

/// GET /health - 200 when the document store answers, 503 otherwise
pub async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    let now = crate::types::timestamp::format(&chrono::Utc::now());

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": true,
                    "message": "Database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
