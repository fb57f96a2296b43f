//! FILENAME: app/server/src/error.rs
//! PURPOSE: Error-to-HTTP mapping for the portal API.
//! CONTEXT: Engine crates raise typed errors; this module folds them into
//! one API error with a status code and a JSON `{"error": ...}` body.
//! Client-caused problems map to 400, missing datasets to 404, the refresh
//! token to 403, deadline/cancellation to 408/499, remote fetch failures
//! to 502 and everything unexpected to 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    Cancelled(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            // 499 is the de-facto "client closed request" status.
            ApiError::Cancelled(_) => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, ApiError::Internal(_)) {
            tracing::error!(error = %self, "internal error");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

impl From<persistence::LoadError> for ApiError {
    fn from(err: persistence::LoadError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<persistence::ExportError> for ApiError {
    fn from(err: persistence::ExportError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<model::StoreError> for ApiError {
    fn from(err: model::StoreError) -> Self {
        match err {
            model::StoreError::UnknownDataset(_) => ApiError::NotFound(err.to_string()),
            model::StoreError::UnknownColumn(_) => ApiError::BadRequest(err.to_string()),
            model::StoreError::Calculation(_) => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<pivot_engine::PivotError> for ApiError {
    fn from(err: pivot_engine::PivotError) -> Self {
        use pivot_engine::PivotError;
        match err {
            PivotError::Cancelled => ApiError::Cancelled(err.to_string()),
            PivotError::Timeout => ApiError::Timeout(err.to_string()),
            _ => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<dashboard_engine::DashboardError> for ApiError {
    fn from(err: dashboard_engine::DashboardError) -> Self {
        use dashboard_engine::DashboardError;
        match err {
            DashboardError::UnknownDataset(_) => ApiError::NotFound(err.to_string()),
            DashboardError::NoDatasets | DashboardError::EmptyInput => {
                ApiError::BadRequest(err.to_string())
            }
            DashboardError::Projection(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<crate::drive::FetchError> for ApiError {
    fn from(err: crate::drive::FetchError) -> Self {
        match err {
            crate::drive::FetchError::Disabled => ApiError::BadRequest(err.to_string()),
            crate::drive::FetchError::Unavailable(_) => ApiError::BadGateway(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(ApiError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::Timeout("x".into()).status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(ApiError::Cancelled("x".into()).status_code().as_u16(), 499);
        assert_eq!(ApiError::BadGateway("x".into()).status_code(), StatusCode::BAD_GATEWAY);
    }
}
