use sqlx::FromRow;

/// Projection of a resume record owned by the application's store. This
/// service only ever reads it.
#[derive(Debug, Clone, FromRow)]
pub struct ResumeSlugRow {
    pub id: String,
    pub slug: Option<String>,
}
