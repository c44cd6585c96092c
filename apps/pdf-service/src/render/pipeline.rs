//! The per-request render state machine.
//!
//! `Launching -> Navigating -> AwaitingReadiness -> Capturing -> Done`, with a
//! single teardown point after the sequence regardless of which stage
//! failed. Browser specifics sit behind [`BrowserLauncher`] and
//! [`BrowserSession`] so the sequencing and timeout rules are independent of
//! the CDP client.

use std::fmt;

use async_trait::async_trait;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::layout::{PageLayout, Viewport, CAPTURE_VIEWPORT};
use super::{is_pdf, RenderError, RenderSettings, Renderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Launching,
    Navigating,
    AwaitingReadiness,
    Capturing,
    Done,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderStage::Launching => "launching",
            RenderStage::Navigating => "navigating",
            RenderStage::AwaitingReadiness => "awaiting_readiness",
            RenderStage::Capturing => "capturing",
            RenderStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Starts one isolated browser process.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, RenderError>;
}

/// A live browser process with one page open.
///
/// `navigate` and `wait_for_selector` may run unbounded; the pipeline owns
/// their time budgets. Implementations must terminate the process on drop if
/// `close` was never reached (e.g. the request future was cancelled).
#[async_trait]
pub trait BrowserSession: Send {
    /// Loads `url` and resolves once the network has gone idle.
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError>;

    /// Resolves once an element matching `selector` is in the DOM.
    async fn wait_for_selector(&mut self, selector: &str) -> Result<(), RenderError>;

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<(), RenderError>;

    async fn print_pdf(&mut self, layout: &PageLayout) -> Result<Vec<u8>, RenderError>;

    /// Terminates the browser process.
    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}

/// [`Renderer`] that launches a fresh browser for every call.
pub struct BrowserRenderer<L> {
    launcher: L,
    settings: RenderSettings,
    layout: PageLayout,
}

impl<L: BrowserLauncher> BrowserRenderer<L> {
    pub fn new(launcher: L, settings: RenderSettings) -> Self {
        Self {
            launcher,
            settings,
            layout: PageLayout::a4(),
        }
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<Vec<u8>, RenderError> {
        let settings = &self.settings;

        debug!(stage = %RenderStage::Navigating, url, "Navigating");
        timeout(settings.navigation_timeout, session.navigate(url))
            .await
            .map_err(|_| RenderError::NavigationTimeout {
                url: url.to_string(),
                timeout: settings.navigation_timeout,
            })??;

        debug!(
            stage = %RenderStage::AwaitingReadiness,
            selector = %settings.ready_selector,
            "Waiting for readiness marker"
        );
        timeout(
            settings.readiness_timeout,
            session.wait_for_selector(&settings.ready_selector),
        )
        .await
        .map_err(|_| RenderError::ReadinessTimeout {
            selector: settings.ready_selector.clone(),
            timeout: settings.readiness_timeout,
        })??;

        debug!(stage = %RenderStage::Capturing, "Capturing");
        session.set_viewport(CAPTURE_VIEWPORT).await?;
        let bytes = session.print_pdf(&self.layout).await?;

        if !is_pdf(&bytes) {
            return Err(RenderError::CaptureFailure(format!(
                "browser returned {} bytes without a PDF signature",
                bytes.len()
            )));
        }

        Ok(bytes)
    }

    async fn run(&self, url: &str) -> Result<Vec<u8>, RenderError> {
        let started = Instant::now();

        debug!(stage = %RenderStage::Launching, "Launching browser");
        let mut session = self.launcher.launch().await.inspect_err(|e| {
            error!(stage = %RenderStage::Launching, operational = true, "{e}");
        })?;

        let outcome = self.drive(session.as_mut(), url).await;

        // Teardown runs exactly once, whatever the outcome.
        if let Err(e) = session.close().await {
            error!(operational = true, "Browser teardown failed: {e}");
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(bytes) => info!(
                stage = %RenderStage::Done,
                bytes = bytes.len(),
                elapsed_ms,
                "Rendered {url}"
            ),
            Err(e) if e.is_operational() => error!(elapsed_ms, operational = true, "{e}"),
            Err(e) => warn!(elapsed_ms, "{e}"),
        }

        outcome
    }
}

#[async_trait]
impl<L: BrowserLauncher> Renderer for BrowserRenderer<L> {
    async fn render(&self, url: &str) -> Result<Vec<u8>, RenderError> {
        let span = info_span!("render", render_id = %Uuid::new_v4());
        self.run(url).instrument(span).await
    }
}
