//! chromiumoxide-backed browser sessions.
//!
//! Each launch spawns its own Chromium process with a throwaway profile
//! directory. chromiumoxide needs its `Handler` stream polled for the CDP
//! connection to make progress, so every session owns a task driving it.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use super::layout::{PageLayout, Viewport, CAPTURE_VIEWPORT};
use super::network_idle::NetworkIdleTracker;
use super::pipeline::{BrowserLauncher, BrowserSession};
use super::RenderError;
use crate::config::BrowserConfig;

const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(100);
const TEARDOWN_GRACE: Duration = Duration::from_secs(5);
/// Headroom so the pipeline's navigation timeout fires before CDP's own
/// request timeout does.
const CDP_REQUEST_HEADROOM: Duration = Duration::from_secs(5);

pub struct ChromiumLauncher {
    config: BrowserConfig,
}

impl ChromiumLauncher {
    pub fn new(config: &BrowserConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn browser_config(&self, profile_dir: &Path) -> Result<CdpBrowserConfig, RenderError> {
        let mut builder = CdpBrowserConfig::builder()
            .user_data_dir(profile_dir)
            .window_size(CAPTURE_VIEWPORT.width, CAPTURE_VIEWPORT.height)
            .request_timeout(
                self.config
                    .navigation_timeout
                    .saturating_add(CDP_REQUEST_HEADROOM),
            )
            // /dev/shm is tiny in most containers
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        if self.config.no_sandbox {
            builder = builder.no_sandbox().arg("--disable-setuid-sandbox");
        }

        if let Some(path) = &self.config.executable {
            builder = builder.chrome_executable(path);
        }

        builder
            .build()
            .map_err(|e| RenderError::ProcessFailure(format!("invalid browser config: {e}")))
    }

    async fn launch_session(&self) -> Result<ChromiumSession, RenderError> {
        let profile_dir = tempfile::Builder::new()
            .prefix("pdf-service-profile-")
            .tempdir()
            .map_err(|e| {
                RenderError::ProcessFailure(format!("failed to create browser profile dir: {e}"))
            })?;

        let config = self.browser_config(profile_dir.path())?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::ProcessFailure(format!("failed to launch browser: {e}")))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler stopped: {e}");
                    break;
                }
            }
        });

        let opened = browser.new_page("about:blank").await;
        let page = match opened {
            Ok(page) => page,
            Err(e) => {
                if let Err(teardown) = terminate(browser).await {
                    warn!("Teardown after failed page open: {teardown}");
                }
                handler_task.abort();
                return Err(RenderError::ProcessFailure(format!(
                    "failed to open browser page: {e}"
                )));
            }
        };

        debug!("Browser launched");
        Ok(ChromiumSession {
            browser: Some(browser),
            page: Some(page),
            handler: Some(handler_task),
            profile_dir: Some(profile_dir),
            runtime: Handle::current(),
        })
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, RenderError> {
        Ok(Box::new(self.launch_session().await?))
    }
}

fn capture_err(context: &str, err: CdpError) -> RenderError {
    if is_connection_lost(&err) {
        RenderError::ProcessFailure(format!("{context}: browser connection lost: {err}"))
    } else {
        RenderError::CaptureFailure(format!("{context}: {err}"))
    }
}

/// True for errors meaning the CDP connection to the browser is gone, as
/// opposed to a command the live browser answered with an error.
fn is_connection_lost(err: &CdpError) -> bool {
    matches!(
        err,
        CdpError::Ws(_) | CdpError::Io(_) | CdpError::NoResponse | CdpError::ChannelSendError(_)
    )
}

/// One Chromium process, its CDP handler task and its profile directory.
///
/// `close` is the normal teardown path. If the session is dropped without
/// it (cancelled request), `Drop` schedules the same teardown on the
/// runtime captured at launch.
pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
    profile_dir: Option<TempDir>,
    runtime: Handle,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, RenderError> {
        self.page
            .as_ref()
            .ok_or_else(|| RenderError::ProcessFailure("browser page is not open".to_string()))
    }

    /// The CDP handler task ends when the browser connection drops.
    fn connection_closed(&self) -> bool {
        self.handler.as_ref().map_or(true, |h| h.is_finished())
    }

    async fn shutdown(&mut self) -> Result<(), RenderError> {
        self.page = None;
        let result = match self.browser.take() {
            Some(browser) => terminate(browser).await,
            None => Ok(()),
        };
        // The handler has to keep running until the close command is answered.
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        // Removing the profile only after the process is gone.
        drop(self.profile_dir.take());
        result
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> Result<(), RenderError> {
        let page = self.page()?;
        let nav_err = |e: CdpError| {
            if is_connection_lost(&e) {
                RenderError::ProcessFailure(format!(
                    "browser connection lost while loading {url}: {e}"
                ))
            } else {
                RenderError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(nav_err)?;
        let mut events = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(nav_err)?;
        let main_frame = page
            .mainframe()
            .await
            .map_err(nav_err)?
            .map(|frame| frame.inner().clone());
        let mut tracker = NetworkIdleTracker::new(main_frame);

        page.goto(url).await.map_err(nav_err)?;

        while let Some(event) = events.next().await {
            if tracker.observe(event.frame_id.inner(), event.loader_id.inner(), &event.name) {
                debug!(url, "Network idle");
                return Ok(());
            }
        }

        Err(RenderError::ProcessFailure(
            "lifecycle event stream ended before network idle".to_string(),
        ))
    }

    async fn wait_for_selector(&mut self, selector: &str) -> Result<(), RenderError> {
        let page = self.page()?;
        loop {
            if self.connection_closed() {
                return Err(RenderError::ProcessFailure(
                    "browser connection closed during readiness wait".to_string(),
                ));
            }
            match page.find_element(selector).await {
                Ok(_) => return Ok(()),
                Err(e) if is_connection_lost(&e) => {
                    return Err(RenderError::ProcessFailure(format!(
                        "browser connection lost during readiness wait: {e}"
                    )));
                }
                Err(e) => trace!(selector, "Readiness marker not present yet: {e}"),
            }
            tokio::time::sleep(READINESS_POLL_INTERVAL).await;
        }
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> Result<(), RenderError> {
        let params = SetDeviceMetricsOverrideParams::new(
            i64::from(viewport.width),
            i64::from(viewport.height),
            1.0,
            false,
        );
        self.page()?
            .execute(params)
            .await
            .map_err(|e| capture_err("failed to set viewport", e))?;
        Ok(())
    }

    async fn print_pdf(&mut self, layout: &PageLayout) -> Result<Vec<u8>, RenderError> {
        self.page()?
            .pdf(layout.to_print_params())
            .await
            .map_err(|e| capture_err("printToPDF failed", e))
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        let mut session = self;
        session.shutdown().await
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        let handler = self.handler.take();
        let Some(browser) = self.browser.take() else {
            if let Some(handler) = handler {
                handler.abort();
            }
            return;
        };

        warn!("Browser session dropped before teardown, terminating in background");
        let page = self.page.take();
        let profile_dir = self.profile_dir.take();
        self.runtime.spawn(async move {
            drop(page);
            if let Err(e) = terminate(browser).await {
                warn!("Background browser teardown failed: {e}");
            }
            if let Some(handler) = handler {
                handler.abort();
            }
            drop(profile_dir);
        });
    }
}

/// Closes the browser over CDP, falling back to killing the process.
async fn terminate(mut browser: Browser) -> Result<(), RenderError> {
    match timeout(TEARDOWN_GRACE, browser.close()).await {
        Ok(Ok(_)) => match timeout(TEARDOWN_GRACE, browser.wait()).await {
            Ok(Ok(_)) => {
                debug!("Browser process exited");
                return Ok(());
            }
            Ok(Err(e)) => warn!("Failed to reap browser process: {e}"),
            Err(_) => warn!("Browser did not exit within {TEARDOWN_GRACE:?}"),
        },
        Ok(Err(e)) => warn!("Browser close command failed: {e}"),
        Err(_) => warn!("Browser close command timed out"),
    }

    match browser.kill().await {
        Some(Err(e)) => Err(RenderError::ProcessFailure(format!(
            "failed to kill browser process: {e}"
        ))),
        _ => {
            debug!("Browser process killed");
            Ok(())
        }
    }
}
