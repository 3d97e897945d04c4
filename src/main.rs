use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use safecity::random::{self, ThreadRandom};
use safecity::{AppState, Cache, SafeCityConfig, VERSION, telemetry, web};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = SafeCityConfig::load_from_path(config_path).context("Failed to load configuration")?;

    let _telemetry = telemetry::init(&config.logging).context("Failed to initialize logging")?;
    info!("Starting SafeCity API v{}", VERSION);

    let cache = Cache::from_config(&config.cache)
        .with_context(|| format!("Failed to open {} cache", config.cache.backend))?;
    info!("Using {} cache backend", config.cache.backend);

    let server = config.server.clone();
    let state = AppState::new(config, cache, random::shared(ThreadRandom))
        .context("Failed to initialize providers")?;
    if state.providers.openweather.has_key() {
        info!("Live assessment uses OpenWeatherMap");
    } else {
        info!("No OpenWeatherMap key configured; live assessment uses Open-Meteo");
    }

    web::run(&server, web::app(state)).await
}
