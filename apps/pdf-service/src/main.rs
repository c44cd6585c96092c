mod config;
mod db;
mod errors;
mod generation;
mod models;
mod render;
mod resume;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::render::chromium::ChromiumLauncher;
use crate::render::limit::LimitedRenderer;
use crate::render::pipeline::BrowserRenderer;
use crate::render::{RenderSettings, Renderer};
use crate::resume::lookup::PgResumeLookup;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration first; startup aborts on missing or malformed values
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http=info",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting PDF service v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;
    let lookup = PgResumeLookup::new(db, config.resume_url_template.clone());

    let renderer = build_renderer(&config);
    info!(
        navigation_timeout = ?config.browser.navigation_timeout,
        readiness_timeout = ?config.browser.readiness_timeout,
        ready_selector = %config.browser.ready_selector,
        max_concurrent = ?config.max_concurrent_renders,
        "Renderer configured"
    );

    let state = AppState {
        lookup: Arc::new(lookup),
        renderer,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// One browser process per request, optionally capped.
fn build_renderer(config: &Config) -> Arc<dyn Renderer> {
    let launcher = ChromiumLauncher::new(&config.browser);
    let renderer = BrowserRenderer::new(launcher, RenderSettings::from(&config.browser));

    match config.max_concurrent_renders {
        Some(limit) => Arc::new(LimitedRenderer::new(renderer, limit)),
        None => Arc::new(renderer),
    }
}

/// Resolves on Ctrl-C or SIGTERM. In-flight renders finish (and tear down
/// their browsers) before the server returns.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
