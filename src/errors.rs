use crate::services::catalog_service::CatalogError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

/// Client errors keep their message; storage failures are logged with detail
/// and surfaced with a generic one.
impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation(msg) => AppError::bad_request(msg),
            CatalogError::InvalidImagePath { ref name, reason } => {
                tracing::warn!(requested = %name, reason, "rejected image path");
                AppError::bad_request(err.to_string())
            }
            CatalogError::ItemNotFound(_) | CatalogError::ImageNotFound(_) => {
                AppError::not_found(err.to_string())
            }
            CatalogError::Cancelled => {
                AppError::new(StatusCode::SERVICE_UNAVAILABLE, "server is shutting down")
            }
            CatalogError::Corrupt(_) | CatalogError::Io(_) => {
                tracing::error!("storage failure: {}", err);
                AppError::internal("internal storage error")
            }
        }
    }
}
