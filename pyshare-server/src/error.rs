//! Error types for the HTTP API

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use pyshare_core::{ResolveError, StoreError};

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Upload failed: {}", .0.body_text())]
    Multipart(#[from] MultipartError),

    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody {
            error: String,
            code: &'static str,
        }

        let (status, code) = match &self {
            ApiError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Store(StoreError::EmptyManifest) => (StatusCode::NOT_FOUND, "EMPTY_MANIFEST"),
            ApiError::Store(StoreError::InvalidName(_)) => (StatusCode::BAD_REQUEST, "INVALID_NAME"),
            ApiError::Store(StoreError::Io(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_FAILURE"),
            ApiError::Store(StoreError::Archive(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "ARCHIVE_FAILURE"),
            ApiError::Resolve(ResolveError::InvalidUrl(_)) => (StatusCode::BAD_REQUEST, "INVALID_URL"),
            ApiError::Resolve(ResolveError::NetworkFailure(_)) => (StatusCode::BAD_GATEWAY, "NETWORK_FAILURE"),
            ApiError::Resolve(ResolveError::ParseFailure(_)) => (StatusCode::BAD_GATEWAY, "PARSE_FAILURE"),
            ApiError::Resolve(ResolveError::ClientBuild(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
            ApiError::Multipart(e) => (e.status(), "UPLOAD_FAILED"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorBody {
            error: self.to_string(),
            code,
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
