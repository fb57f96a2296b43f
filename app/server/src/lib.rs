//! FILENAME: app/server/src/lib.rs
//! HTTP facade for the analytics portal.
//!
//! All state flows through `AppState`; handlers validate inputs, call into
//! the engine crates and serialize the results. Routing lives in
//! `create_app` so tests can drive the full stack in memory.

pub mod config;
pub mod drive;
pub mod error;
pub mod handlers;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use state::SharedState;

/// Uploads are spreadsheets; 50 MiB is generous without being unbounded.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub fn create_app(state: SharedState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/upload", post(handlers::reports::upload))
        .route("/api/filter-values", get(handlers::reports::filter_values))
        .route("/api/pivot", post(handlers::reports::pivot))
        .route("/api/export", post(handlers::reports::export))
        .route("/api/datasets", get(handlers::reports::list_datasets))
        .route("/api/dataset/:id", delete(handlers::reports::delete_dataset))
        .route("/api/calculations", post(handlers::reports::update_calculations))
        .route("/api/dashboard/upload", post(handlers::dashboard::upload))
        .route("/api/dashboard/query", post(handlers::dashboard::query))
        .route(
            "/api/dashboard/dataset/:id",
            delete(handlers::dashboard::delete_dataset),
        )
        .route(
            "/api/dashboard/refresh-drive",
            post(handlers::dashboard::refresh_drive),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
