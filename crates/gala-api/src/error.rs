//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Domain errors
//! are `AppError` (or types convertible into it) and become `HttpAppError`
//! via `?`, so status, body, and logging stay consistent.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gala_core::{AppError, ErrorMetadata, LogLevel};
use gala_storage::StorageError;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
}

/// Wrapper type for AppError to implement IntoResponse. Needed because of
/// Rust's orphan rules: IntoResponse (axum) cannot be implemented for
/// AppError (gala-core) directly.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => HttpAppError(AppError::NotFound(format!(
                "Object not found in storage: {}",
                key
            ))),
            other => HttpAppError(AppError::Storage(other.to_string())),
        }
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Request failed");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let error = self.0;
        log_error(&error);

        let status = StatusCode::from_u16(error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse {
            error: error.client_message(),
            code: error.error_code().to_string(),
            recoverable: error.is_recoverable(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_not_found_maps_to_404() {
        let err = HttpAppError::from(StorageError::NotFound("events/a/b.jpg".to_string()));
        assert_eq!(err.0.http_status_code(), 404);
    }

    #[test]
    fn other_storage_errors_map_to_500() {
        let err = HttpAppError::from(StorageError::UploadFailed("timeout".to_string()));
        assert_eq!(err.0.http_status_code(), 500);
        assert!(err.0.is_recoverable());
    }
}
