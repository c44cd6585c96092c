// Render Orchestrator: validates a render request, resolves the resume to its
// public page, delegates to the renderer and frames the PDF response.
// No retries here; the caller decides whether to resubmit.

pub mod filename;
pub mod handlers;
pub mod service;
