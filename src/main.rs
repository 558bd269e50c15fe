use anyhow::Result;
use stratus::{config::Config, server};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Stratus weather gateway v{}", stratus::VERSION);

    // Load configuration
    let config = Config::load()?;
    config.warn_missing_credentials();

    info!("✓ Configuration loaded");
    info!("  HTTP: {}", config.server.bind);
    info!(
        "  Admission: {} req / {}s window, {} summaries per day",
        config.rate_limiting.max_requests,
        config.rate_limiting.window_secs,
        config.quota.daily_limit
    );

    server::serve(config).await
}
