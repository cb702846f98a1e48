use anyhow::{Context, Result};
use axum::{Router, extract::DefaultBodyLimit};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::api::{self, AppState};
use crate::config::ServerConfig;

/// Room for multipart framing around the largest accepted photo
const UPLOAD_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn app(state: AppState, max_image_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api", api::router(state))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_image_bytes + UPLOAD_OVERHEAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run(server: &ServerConfig, max_image_bytes: usize, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Web server running at http://{}", addr);

    axum::serve(listener, app(state, max_image_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server failed")?;

    tracing::info!("Web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
