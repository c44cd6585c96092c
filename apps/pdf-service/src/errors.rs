use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::render::RenderError;
use crate::resume::lookup::LookupError;

pub const MISSING_FIELDS_MESSAGE: &str = "Missing resumeId or title";
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate PDF";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Only `InvalidRequest` carries its message to the caller. Everything else
/// is logged in full and reduced to a single generic message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => {
                tracing::warn!("Render target not found: {msg}");
                generic_failure()
            }
            AppError::Lookup(e) => {
                tracing::error!("Resume lookup failed: {e}");
                generic_failure()
            }
            AppError::Render(e) => {
                // Already logged with stage detail by the renderer.
                tracing::debug!("Render failed: {e}");
                generic_failure()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                generic_failure()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn generic_failure() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        GENERATION_FAILED_MESSAGE.to_string(),
    )
}
