//! Resolves resume identifiers to the public page the renderer loads.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;

use crate::config::SLUG_PLACEHOLDER;
use crate::models::resume::ResumeSlugRow;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait ResumeLookup: Send + Sync {
    /// Returns the public URL for `resume_id`, or `None` when no record
    /// exists or the record has no addressable slug.
    async fn public_url(&self, resume_id: &str) -> Result<Option<String>, LookupError>;
}

/// Read-only lookup against the application's PostgreSQL `resumes` table.
pub struct PgResumeLookup {
    db: PgPool,
    url_template: String,
}

impl PgResumeLookup {
    pub fn new(db: PgPool, url_template: impl Into<String>) -> Self {
        Self {
            db,
            url_template: url_template.into(),
        }
    }
}

#[async_trait]
impl ResumeLookup for PgResumeLookup {
    async fn public_url(&self, resume_id: &str) -> Result<Option<String>, LookupError> {
        let row = sqlx::query_as::<_, ResumeSlugRow>(
            "SELECT id::text AS id, slug FROM resumes WHERE id::text = $1",
        )
        .bind(resume_id)
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            debug!(resume_id, "No resume record");
            return Ok(None);
        };

        let url = row
            .slug
            .as_deref()
            .and_then(|slug| public_url_for(&self.url_template, slug));
        if url.is_none() {
            debug!(resume_id = %row.id, "Resume has no public slug");
        }
        Ok(url)
    }
}

/// Substitutes `slug` into the URL template. Blank slugs and slugs that
/// would escape their path segment are not addressable.
pub fn public_url_for(template: &str, slug: &str) -> Option<String> {
    let slug = slug.trim();
    let addressable = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && slug != "."
        && slug != "..";

    addressable.then(|| template.replace(SLUG_PLACEHOLDER, slug))
}
