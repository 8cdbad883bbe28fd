use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use aerobook_core::CoreError;
use aerobook_search::SearchError;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    UpstreamError(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::UpstreamError(msg) => {
                tracing::warn!("Upstream failure: {}", msg);
                (StatusCode::BAD_GATEWAY, "Search could not be completed".to_string())
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(_) => AppError::ValidationError(err.to_string()),
            CoreError::NotFound(_) => AppError::NotFoundError(err.to_string()),
            CoreError::NoSeatsAvailable { .. } | CoreError::InvalidState(_) => {
                AppError::ConflictError(err.to_string())
            }
            CoreError::StorageError(_) | CoreError::CacheError(_) | CoreError::Unavailable(_) => {
                AppError::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Invalid(inner) => AppError::ValidationError(inner.to_string()),
            SearchError::QueueClosed => AppError::InternalServerError(err.to_string()),
            SearchError::NotReady { .. } => AppError::NotFoundError(err.to_string()),
            SearchError::Failed { .. } => AppError::UpstreamError(err.to_string()),
        }
    }
}
