/// Tracks CDP `Page.lifecycleEvent`s for one navigation and reports when the
/// navigated document has gone network-idle.
///
/// Only events for the main frame count, and a `networkIdle` is accepted
/// only if it belongs to the loader that emitted the most recent `init`.
/// This ignores idle signals left over from the blank page the tab was
/// opened on.
#[derive(Debug, Default)]
pub struct NetworkIdleTracker {
    main_frame: Option<String>,
    loader: Option<String>,
}

pub const EVENT_INIT: &str = "init";
pub const EVENT_NETWORK_IDLE: &str = "networkIdle";

impl NetworkIdleTracker {
    pub fn new(main_frame: Option<String>) -> Self {
        Self {
            main_frame,
            loader: None,
        }
    }

    /// Feeds one lifecycle event. Returns true once idle is reached.
    pub fn observe(&mut self, frame_id: &str, loader_id: &str, name: &str) -> bool {
        if let Some(frame) = &self.main_frame {
            if frame != frame_id {
                return false;
            }
        }

        match name {
            EVENT_INIT => {
                self.loader = Some(loader_id.to_string());
                false
            }
            EVENT_NETWORK_IDLE => self.loader.as_deref() == Some(loader_id),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_after_init_same_loader() {
        let mut tracker = NetworkIdleTracker::new(Some("F1".into()));
        assert!(!tracker.observe("F1", "L2", "init"));
        assert!(!tracker.observe("F1", "L2", "DOMContentLoaded"));
        assert!(!tracker.observe("F1", "L2", "networkAlmostIdle"));
        assert!(tracker.observe("F1", "L2", "networkIdle"));
    }

    #[test]
    fn test_stale_idle_from_blank_page_ignored() {
        let mut tracker = NetworkIdleTracker::new(Some("F1".into()));
        // about:blank loader reports idle before the real navigation starts
        assert!(!tracker.observe("F1", "L1", "networkIdle"));
        assert!(!tracker.observe("F1", "L2", "init"));
        assert!(!tracker.observe("F1", "L1", "networkIdle"));
        assert!(tracker.observe("F1", "L2", "networkIdle"));
    }

    #[test]
    fn test_child_frames_ignored() {
        let mut tracker = NetworkIdleTracker::new(Some("F1".into()));
        assert!(!tracker.observe("F1", "L2", "init"));
        assert!(!tracker.observe("IFRAME", "L9", "init"));
        assert!(!tracker.observe("IFRAME", "L9", "networkIdle"));
        assert!(tracker.observe("F1", "L2", "networkIdle"));
    }

    #[test]
    fn test_unknown_main_frame_accepts_any_frame() {
        let mut tracker = NetworkIdleTracker::default();
        assert!(!tracker.observe("F7", "L3", "init"));
        assert!(tracker.observe("F7", "L3", "networkIdle"));
    }
}
