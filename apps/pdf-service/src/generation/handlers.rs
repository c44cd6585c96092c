//! Axum route handlers for PDF generation.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use crate::errors::{AppError, MISSING_FIELDS_MESSAGE};
use crate::generation::service::{generate_pdf, GenerateRequest};
use crate::state::AppState;

/// POST /generate
///
/// Body: `{ "resumeId": string, "title": string }`. Responds with the PDF
/// as an attachment. Unparseable bodies are reported like missing fields.
pub async fn handle_generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!("Rejected generate body: {rejection}");
        AppError::InvalidRequest(MISSING_FIELDS_MESSAGE.to_string())
    })?;

    let pdf = generate_pdf(state.lookup.as_ref(), state.renderer.as_ref(), request).await?;

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", pdf.filename))
        .map_err(|e| AppError::Internal(e.into()))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf.bytes,
    )
        .into_response())
}
