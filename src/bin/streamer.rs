//! Spectrum streamer server
//!
//! Samples the configured source and serves Welch estimates on `/sde`.
//!
//! Usage: `spectrum-streamer [config.toml]`

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spectrum_streamer::{config::AppConfig, Application};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting spectrum streamer");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).context("failed to load configuration")?;

    let app = Application::from_config(config)?;
    tracing::info!(
        "Serving /sde on {}:{} - press Ctrl+C to stop",
        app.config().server.bind_address,
        app.config().server.http_port
    );

    app.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
        tracing::info!("Shutdown requested");
    })
    .await?;

    tracing::info!("Spectrum streamer stopped");
    Ok(())
}
