use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use landmarkai::api::AppState;
use landmarkai::config::LoggingConfig;
use landmarkai::{Catalog, GeminiBackend, LandmarkAiConfig, VERSION, web};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = LandmarkAiConfig::load_from_path(config_path).context("Failed to load configuration")?;

    init_logging(&config.logging);
    info!("LandmarkAI v{} starting", VERSION);

    let catalog = match &config.catalog.path {
        Some(path) => Catalog::load(path).with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => Catalog::builtin(),
    };
    info!("Catalog ready with {} landmarks", catalog.landmarks().len());

    let backend = GeminiBackend::new(&config.gemini).context("Failed to create Gemini backend")?;
    info!("Using model {}", config.gemini.model);

    let state = AppState::new(Arc::new(backend), catalog, &config);
    web::run(&config.server, config.recognition.max_image_bytes, state).await
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
