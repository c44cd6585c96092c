// Renderer: owns the headless-browser lifecycle for a single resume URL.
// One browser process per request; teardown on every exit path.

pub mod chromium;
pub mod layout;
pub mod limit;
pub mod network_idle;
pub mod pipeline;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::BrowserConfig;

/// Failure classes of a single render. Every variant is terminal for the
/// request; none are retried internally.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("browser process failure: {0}")]
    ProcessFailure(String),

    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("readiness marker '{selector}' did not appear within {timeout:?}")]
    ReadinessTimeout { selector: String, timeout: Duration },

    #[error("capture failed: {0}")]
    CaptureFailure(String),
}

impl RenderError {
    /// Process failures point at environment misconfiguration rather than a
    /// slow or broken target page.
    pub fn is_operational(&self) -> bool {
        matches!(self, RenderError::ProcessFailure(_))
    }
}

/// Per-deployment render tunables.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub navigation_timeout: Duration,
    pub readiness_timeout: Duration,
    pub ready_selector: String,
}

impl From<&BrowserConfig> for RenderSettings {
    fn from(config: &BrowserConfig) -> Self {
        Self {
            navigation_timeout: config.navigation_timeout,
            readiness_timeout: config.readiness_timeout,
            ready_selector: config.ready_selector.clone(),
        }
    }
}

/// Turns one URL into one paginated PDF.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<Vec<u8>, RenderError>;
}

/// Returns true if the buffer carries a PDF file signature.
pub fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}
