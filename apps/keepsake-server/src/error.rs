//! Error types for the Keepsake server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::gallery::RenderError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Form parse error: {0}")]
    FormParse(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Upload stalled: no data received for {0} seconds")]
    UploadTimeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::FormParse(msg) => {
                tracing::warn!("Rejected upload form: {}", msg);
                (StatusCode::BAD_REQUEST, "form_parse_error", msg.clone())
            }
            AppError::InvalidFilename(name) => {
                tracing::warn!("Rejected upload filename: {}", name);
                (
                    StatusCode::BAD_REQUEST,
                    "invalid_filename",
                    format!("Cannot derive a file extension from '{}'", name),
                )
            }
            AppError::UploadTimeout(secs) => {
                tracing::warn!("Upload stalled for {}s", secs);
                (
                    StatusCode::REQUEST_TIMEOUT,
                    "upload_timeout",
                    "Upload stalled before completion".to_string(),
                )
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    "Failed to store the uploaded file".to_string(),
                )
            }
            AppError::Render(e) => {
                tracing::error!("Render error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "render_error",
                    "Failed to render page".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
