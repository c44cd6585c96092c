use std::sync::Arc;

use crate::render::Renderer;
use crate::resume::lookup::ResumeLookup;

/// Shared application state injected into all route handlers via Axum extractors.
/// Holds no per-request browser state; each render owns its own process.
#[derive(Clone)]
pub struct AppState {
    pub lookup: Arc<dyn ResumeLookup>,
    pub renderer: Arc<dyn Renderer>,
}
