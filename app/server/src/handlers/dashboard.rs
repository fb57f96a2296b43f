//! FILENAME: app/server/src/handlers/dashboard.rs
//! PURPOSE: Contracts dashboard endpoints: upload, query, delete, remote
//! refresh.
//! CONTEXT: Replacing the primary contracts dataset also rewrites the
//! `dashboard_data.json` projection the auxiliary dashboards read, so the
//! two surfaces never disagree for longer than one atomic rename.

use crate::error::ApiError;
use crate::state::SharedState;
use axum::extract::{Multipart, Path, State};
use axum::http::HeaderMap;
use axum::Json;
use dashboard_engine::{build_view, projection_payload, write_projection, ContractsDataset, DashboardQuery};
use persistence::load_table;
use serde_json::json;

const TOKEN_HEADER: &str = "x-portal-token";

async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("planilha_despesas.xlsx").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            return Ok((filename, bytes.to_vec()));
        }
    }
    Err(ApiError::BadRequest("Nenhum arquivo foi enviado.".to_string()))
}

/// Normalizes an uploaded workbook, publishes it as the primary contracts
/// dataset and rewrites the projection file.
fn ingest_contracts(
    state: &SharedState,
    filename: String,
    bytes: &[u8],
) -> Result<serde_json::Value, ApiError> {
    let table = load_table(&filename, bytes)?;
    let today = state.today();
    let dataset = ContractsDataset::from_table(
        state.contracts.allocate_id(),
        filename,
        &table,
        today,
    )?;
    let dataset = state.contracts.insert(dataset);

    let payload = projection_payload(&dataset, today, &state.config.thresholds);
    write_projection(&state.config.dashboard_data_path, &payload)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(
        dataset = %dataset.id,
        rows = dataset.rows.len(),
        months = dataset.months.len(),
        "contracts dataset replaced"
    );

    Ok(json!({
        "dataset": { "id": dataset.id, "name": dataset.name },
        "datasets": state.contracts.list(),
        "warnings": dataset.warnings,
    }))
}

/// Boot-time ingestion used by `main` for the startup sync. Returns the
/// published dataset id.
pub fn ingest_on_boot(
    state: &SharedState,
    filename: String,
    bytes: &[u8],
) -> Result<String, ApiError> {
    let envelope = ingest_contracts(state, filename, bytes)?;
    Ok(envelope["dataset"]["id"]
        .as_str()
        .unwrap_or_default()
        .to_string())
}

/// POST /api/dashboard/upload
pub async fn upload(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (filename, bytes) = read_upload(multipart).await?;
    Ok(Json(ingest_contracts(&state, filename, &bytes)?))
}

/// POST /api/dashboard/query
pub async fn query(
    State(state): State<SharedState>,
    Json(query): Json<DashboardQuery>,
) -> Result<Json<dashboard_engine::DashboardView>, ApiError> {
    let dataset = state.contracts.get_or_latest(query.dataset_id.as_deref())?;
    let view = build_view(
        &dataset,
        state.contracts.list(),
        &query,
        state.today(),
        &state.config.thresholds,
    );
    Ok(Json(view))
}

/// DELETE /api/dashboard/dataset/{id}
pub async fn delete_dataset(
    State(state): State<SharedState>,
    Path(dataset_id): Path<String>,
) -> Json<serde_json::Value> {
    state.contracts.delete(&dataset_id);
    let datasets = state.contracts.list();
    let view = state.contracts.get_or_latest(None).ok().map(|dataset| {
        build_view(
            &dataset,
            datasets.clone(),
            &DashboardQuery::default(),
            state.today(),
            &state.config.thresholds,
        )
    });
    Json(json!({ "datasets": datasets, "view": view }))
}

/// POST /api/dashboard/refresh-drive
///
/// With a configured sync token, the X-Portal-Token header must match
/// byte-for-byte; any mismatch (or absence) is 403.
pub async fn refresh_drive(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(expected) = &state.config.sync_token {
        let provided = headers
            .get(TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if provided.as_bytes() != expected.as_bytes() {
            return Err(ApiError::Forbidden("Token de sincronização inválido.".to_string()));
        }
    }

    let file_id = state
        .config
        .drive_file_id
        .clone()
        .ok_or(crate::drive::FetchError::Disabled)?;

    let provider = state.provider.clone();
    let (filename, bytes) = tokio::task::spawn_blocking(move || provider.fetch(&file_id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(ingest_contracts(&state, filename, &bytes)?))
}
