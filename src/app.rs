//! Application wiring: source, sampler, hub and web server

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::error::{Error, Result, SamplerError};
use crate::hub::Hub;
use crate::protocol::SamplerState;
use crate::sampler::{Pipeline, Sampler};
use crate::source::{driver_from_config, SampleSource, SourceAdapter};
use crate::web::WebServer;

/// Owns the single source handle and everything built around it
pub struct Application {
    config: AppConfig,
    hub: Arc<Hub>,
    sampler: Sampler,
}

impl Application {
    pub fn new(config: AppConfig, driver: Box<dyn SampleSource>) -> Result<Self> {
        config.validate()?;

        let hub = Arc::new(Hub::new());
        let pipeline = Pipeline::from_config(hub.clone(), &config)?;
        let sampler = Sampler::new(
            SourceAdapter::new(driver),
            config.source.clone(),
            Arc::new(pipeline),
        );

        Ok(Self {
            config,
            hub,
            sampler,
        })
    }

    /// Build with the driver named in the configuration
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let driver = driver_from_config(&config.source)?;
        Self::new(config, driver)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn hub(&self) -> Arc<Hub> {
        self.hub.clone()
    }

    pub fn sampler_state(&self) -> SamplerState {
        self.sampler.state()
    }

    pub fn web_server(&self) -> WebServer {
        WebServer::new(
            self.config.server.clone(),
            self.hub.clone(),
            self.sampler.state_handle(),
        )
    }

    /// Acquire the source and begin sampling
    pub async fn on_startup(&mut self) -> Result<()> {
        tracing::info!(
            "Opening {:?} source: {} Hz at {} Hz center, {} samples per frame",
            self.config.source.kind,
            self.config.source.sample_rate,
            self.config.source.center_freq,
            self.config.source.samples_per_frame
        );
        self.sampler.start(self.config.sampler.delay()).await
    }

    /// Stop sampling; returns once the source has been released
    pub async fn on_shutdown(&mut self) -> Result<()> {
        match self.sampler.stop().await {
            Ok(()) | Err(Error::Sampler(SamplerError::NotStarted)) => {}
            Err(e) => return Err(e),
        }
        tracing::info!("Sample source released");
        Ok(())
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = self.web_server().bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(mut self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.on_startup().await?;

        let served = self.web_server().serve(listener, shutdown).await;
        if let Err(e) = &served {
            tracing::error!("Web server failed: {}", e);
        }

        self.on_shutdown().await?;
        served
    }
}
