//! FILENAME: app/server/src/handlers/mod.rs

pub mod dashboard;
pub mod reports;

use axum::Json;
use serde_json::json;

/// GET /healthz
pub async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
