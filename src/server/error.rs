//! Error-to-HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thumbcache_common::Error;

/// Wrapper so handlers can return `Result<T, thumbcache_common::Error>`.
pub struct AppError(pub Error);

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidInput(_) | Error::NothingToRespond => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::FetchFailed(_) => StatusCode::BAD_GATEWAY,
            Error::CacheUnavailable(_) | Error::QueueOverloaded | Error::QueueClosed(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Error::PersistFailed(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "Server error in API handler");
        }

        let body = json!({
            "error": self.0.to_string(),
            "code": self.0.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
