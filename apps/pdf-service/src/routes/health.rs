/// GET /health
/// Liveness only; never touches the renderer or the store.
pub async fn health_handler() -> &'static str {
    "OK"
}
