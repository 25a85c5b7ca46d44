//! One-shot capture tool
//!
//! Reads a single frame from the configured source and writes it as a
//! replay file that `kind = "replay"` can stream later.
//!
//! Usage: `dump-samples <output> [config.toml]`

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spectrum_streamer::{
    config::AppConfig,
    error::Error,
    sampler::{Control, FrameSink, Sampler},
    source::{driver_from_config, replay::write_capture, SampleFrame, SourceAdapter},
};

/// Writes the first frame it sees, then stops the sampler
struct CaptureSink {
    output: PathBuf,
    written: Mutex<Option<usize>>,
}

#[async_trait]
impl FrameSink for CaptureSink {
    async fn consume(&self, frame: SampleFrame) -> Control {
        if let Err(e) = write_capture(&self.output, &frame.samples) {
            return Control::Error(Error::Io(e));
        }
        *self.written.lock() = Some(frame.len());
        Control::Stop
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(output) = args.next().map(PathBuf::from) else {
        bail!("usage: dump-samples <output> [config.toml]");
    };
    let config_path = args.next().map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).context("failed to load configuration")?;

    let driver = driver_from_config(&config.source)?;
    let sink = Arc::new(CaptureSink {
        output: output.clone(),
        written: Mutex::new(None),
    });
    let mut sampler = Sampler::new(SourceAdapter::new(driver), config.source.clone(), sink.clone());

    sampler.start(config.sampler.delay()).await?;
    sampler.wait().await?;

    let written = *sink.written.lock();
    match written {
        Some(samples) => {
            tracing::info!("Wrote {} samples to {}", samples, output.display());
            Ok(())
        }
        None => bail!("no frame captured"),
    }
}
