use bytes::Bytes;
use serde::Deserialize;
use tracing::{info, instrument, Span};

use super::filename::pdf_filename;
use crate::errors::{AppError, MISSING_FIELDS_MESSAGE};
use crate::render::Renderer;
use crate::resume::lookup::ResumeLookup;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub resume_id: Option<String>,
    pub title: Option<String>,
}

/// A finished render, held fully in memory before any response is sent.
#[derive(Debug)]
pub struct GeneratedPdf {
    pub bytes: Bytes,
    pub filename: String,
}

/// Validate → resolve → render. Each step's failure is terminal.
#[instrument(skip_all, fields(resume_id))]
pub async fn generate_pdf(
    lookup: &dyn ResumeLookup,
    renderer: &dyn Renderer,
    request: GenerateRequest,
) -> Result<GeneratedPdf, AppError> {
    let (Some(resume_id), Some(title)) = (non_blank(request.resume_id), non_blank(request.title))
    else {
        return Err(AppError::InvalidRequest(MISSING_FIELDS_MESSAGE.to_string()));
    };
    Span::current().record("resume_id", resume_id.as_str());

    let url = lookup
        .public_url(&resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("resume {resume_id} has no public page")))?;

    let bytes = renderer.render(&url).await?;
    info!(bytes = bytes.len(), "PDF generated");

    Ok(GeneratedPdf {
        bytes: Bytes::from(bytes),
        filename: pdf_filename(&title),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
