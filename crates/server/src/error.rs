//! API error types.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use depot_storage::StorageError;
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] depot_metadata::MetadataError),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Storage(e) => e.error_type(),
            Self::Metadata(_) => "metadata_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage(e) => match e {
                StorageError::UnknownCategory(_)
                | StorageError::InvalidFileName(_)
                | StorageError::InvalidRange(_) => StatusCode::BAD_REQUEST,
                StorageError::FileNotFound(_)
                | StorageError::NotAFile(_)
                | StorageError::LocationNotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Metadata(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_status_mapping() {
        let cases = [
            (
                ApiError::from(StorageError::UnknownCategory("X".into())),
                StatusCode::BAD_REQUEST,
                "unknown_category",
            ),
            (
                ApiError::from(StorageError::FileNotFound("a.bin".into())),
                StatusCode::NOT_FOUND,
                "file_not_found",
            ),
            (
                ApiError::from(StorageError::NotAFile("dir".into())),
                StatusCode::NOT_FOUND,
                "not_a_file",
            ),
            (
                ApiError::from(StorageError::MergeFailed {
                    file_name: "a.bin".into(),
                    source: std::io::Error::other("disk full"),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
                "merge_failed",
            ),
        ];
        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status);
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn test_message_names_the_file() {
        let err = ApiError::from(StorageError::FileNotFound("report.json".into()));
        assert!(err.to_string().contains("report.json"));
    }
}
