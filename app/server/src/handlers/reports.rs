//! FILENAME: app/server/src/handlers/reports.rs
//! PURPOSE: Workbench endpoints: upload, filter values, pivot, export,
//! dataset management, persisted calculations.
//! CONTEXT: Handlers are stateless; every pivot runs against the snapshot
//! captured at entry, so a concurrent calculation update never produces a
//! half-applied schema.

use crate::error::ApiError;
use crate::state::SharedState;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use model::CalculationSpec;
use persistence::{export_filename, load_table, write_excel, write_pdf, ExportGrid};
use pivot_engine::{
    aggregation_options, run_pivot, CancelHandle, ExecutionGuard, PivotQuery, PivotResult,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const PDF_MIME: &str = "application/pdf";

/// Cancels the pivot guard when the request future is dropped (client
/// disconnect).
struct CancelOnDrop(CancelHandle);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Extracts the `file` part of a multipart upload.
async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("dataset").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            return Ok((filename, bytes.to_vec()));
        }
    }
    Err(ApiError::BadRequest("Nenhum arquivo foi enviado.".to_string()))
}

fn dataset_envelope(dataset: &model::Dataset) -> serde_json::Value {
    let schema: BTreeMap<String, String> = dataset
        .schema()
        .iter()
        .map(|entry| (entry.key.clone(), entry.kind.dtype_name().to_string()))
        .collect();
    json!({
        "datasetId": dataset.id,
        "name": dataset.name,
        "columns": dataset.schema().iter().map(|s| s.key.clone()).collect::<Vec<_>>(),
        "dimensions": dataset.dimensions(),
        "measures": dataset.measures(),
        "schema": schema,
        "rowCount": dataset.table.row_count(),
        "aggregations": aggregation_options(&dataset.measure_labels()),
    })
}

/// POST /api/upload
pub async fn upload(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (filename, bytes) = read_upload(multipart).await?;
    let table = load_table(&filename, &bytes)?;
    let dataset = state.datasets.put(filename.clone(), table);
    tracing::info!(dataset = %dataset.id, name = %filename, rows = dataset.table.row_count(), "dataset uploaded");
    Ok(Json(dataset_envelope(&dataset)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterValuesParams {
    pub dataset_id: String,
    pub field: String,
}

/// GET /api/filter-values?datasetId=...&field=...
pub async fn filter_values(
    State(state): State<SharedState>,
    Query(params): Query<FilterValuesParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let dataset = state.datasets.get(&params.dataset_id)?;
    let values = dataset.filter_values(&params.field)?;
    Ok(Json(json!({ "values": *values })))
}

/// POST /api/pivot
pub async fn pivot(
    State(state): State<SharedState>,
    Json(query): Json<PivotQuery>,
) -> Result<Json<PivotResult>, ApiError> {
    let result = execute_pivot(&state, query).await?;
    Ok(Json(result))
}

async fn execute_pivot(state: &SharedState, query: PivotQuery) -> Result<PivotResult, ApiError> {
    let dataset = state.datasets.get(&query.dataset_id)?;
    let handle = CancelHandle::new();
    let cancel_on_drop = CancelOnDrop(handle.clone());
    let guard = ExecutionGuard::new(handle);

    let result = tokio::task::spawn_blocking(move || run_pivot(&dataset, &query, &guard))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    // Reaching this point means the client is still connected.
    std::mem::forget(cancel_on_drop);
    Ok(result)
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(flatten)]
    pub query: PivotQuery,
    #[serde(default = "default_export_format")]
    pub format: String,
}

fn default_export_format() -> String {
    "excel".to_string()
}

/// POST /api/export
pub async fn export(
    State(state): State<SharedState>,
    Json(request): Json<ExportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let dataset = state.datasets.get(&request.query.dataset_id)?;
    let dataset_name = dataset.name.clone();
    let result = execute_pivot(&state, request.query).await?;
    let grid = ExportGrid::from_pivot(&result);

    let (bytes, filename, mime) = match request.format.to_lowercase().as_str() {
        "excel" | "xlsx" => (
            write_excel(&grid, "Pivot")?,
            export_filename(&dataset_name, "xlsx"),
            XLSX_MIME,
        ),
        "pdf" => (
            write_pdf(&grid, "Tabela Dinâmica")?,
            export_filename(&dataset_name, "pdf"),
            PDF_MIME,
        ),
        other => {
            return Err(ApiError::BadRequest(format!(
                "Formato de exportação inválido: '{}'.",
                other
            )))
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, mime.parse().unwrap());
    headers.insert(
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{}\"", filename)
            .parse()
            .unwrap(),
    );
    Ok((headers, bytes))
}

/// GET /api/datasets
pub async fn list_datasets(State(state): State<SharedState>) -> Json<serde_json::Value> {
    Json(json!({ "datasets": state.datasets.list() }))
}

/// DELETE /api/dataset/{id} - idempotent, 204 either way.
pub async fn delete_dataset(
    State(state): State<SharedState>,
    Path(dataset_id): Path<String>,
) -> StatusCode {
    let removed = state.datasets.delete(&dataset_id);
    tracing::info!(dataset = %dataset_id, removed, "dataset delete");
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationsRequest {
    pub dataset_id: String,
    #[serde(default)]
    pub pre: Vec<CalculationSpec>,
    #[serde(default)]
    pub post: Vec<CalculationSpec>,
}

/// POST /api/calculations - persists calculated columns so later pivots
/// need not re-evaluate them.
pub async fn update_calculations(
    State(state): State<SharedState>,
    Json(request): Json<CalculationsRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (dataset, warnings) =
        state
            .datasets
            .update_calculations(&request.dataset_id, request.pre, request.post)?;
    let mut envelope = dataset_envelope(&dataset);
    envelope["warnings"] = json!(warnings);
    envelope["availablePostColumns"] = json!(dataset.available_post_columns());
    Ok(Json(envelope))
}
