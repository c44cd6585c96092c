use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::debug;

use super::{RenderError, Renderer};

/// Caps the number of renders (and so browser processes) in flight at once.
/// Callers over the cap wait for a slot; nothing is pooled or shared.
pub struct LimitedRenderer<R> {
    inner: R,
    slots: Semaphore,
}

impl<R: Renderer> LimitedRenderer<R> {
    pub fn new(inner: R, max_concurrent: usize) -> Self {
        Self {
            inner,
            slots: Semaphore::new(max_concurrent.min(Semaphore::MAX_PERMITS)),
        }
    }
}

#[async_trait]
impl<R: Renderer> Renderer for LimitedRenderer<R> {
    async fn render(&self, url: &str) -> Result<Vec<u8>, RenderError> {
        let _slot = self
            .slots
            .acquire()
            .await
            .map_err(|_| RenderError::ProcessFailure("render limiter closed".to_string()))?;
        debug!(
            available = self.slots.available_permits(),
            "Acquired render slot"
        );

        self.inner.render(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct SlowRenderer {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Renderer for SlowRenderer {
        async fn render(&self, _url: &str) -> Result<Vec<u8>, RenderError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(b"%PDF-1.4".to_vec())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_caps_concurrency() {
        let limited = Arc::new(LimitedRenderer::new(SlowRenderer::default(), 2));

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let limited = Arc::clone(&limited);
                tokio::spawn(async move { limited.render("http://localhost/r/a").await })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap().is_ok());
        }

        assert_eq!(limited.inner.peak.load(Ordering::SeqCst), 2);
        assert_eq!(limited.inner.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_oversized_limit_is_clamped() {
        let limited = LimitedRenderer::new(SlowRenderer::default(), usize::MAX);

        assert_eq!(limited.slots.available_permits(), Semaphore::MAX_PERMITS);
        assert!(limited.render("http://localhost/r/a").await.is_ok());
    }
}
