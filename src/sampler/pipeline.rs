//! Transform-then-broadcast sink used by the server

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::dsp::{raw_magnitudes, WelchConfig, WelchEstimator};
use crate::error::{Error, Result, SamplerError, TransformError};
use crate::hub::Hub;
use crate::protocol::Payload;
use crate::sampler::sink::{Control, FrameSink};
use crate::source::SampleFrame;

/// Turns each frame into a payload and publishes it on the hub
pub struct Pipeline {
    hub: Arc<Hub>,
    /// None forwards raw magnitudes
    estimator: Option<Arc<WelchEstimator>>,
    precision: u32,
}

impl Pipeline {
    /// Publish Welch estimates
    pub fn spectral(hub: Arc<Hub>, config: WelchConfig) -> std::result::Result<Self, TransformError> {
        let precision = config.precision;
        let estimator = WelchEstimator::new(config)?;
        Ok(Self {
            hub,
            estimator: Some(Arc::new(estimator)),
            precision,
        })
    }

    /// Publish raw sample magnitudes
    pub fn raw(hub: Arc<Hub>, precision: u32) -> Self {
        Self {
            hub,
            estimator: None,
            precision,
        }
    }

    pub fn from_config(hub: Arc<Hub>, config: &AppConfig) -> Result<Self> {
        if config.transform.enabled {
            let welch = config.transform.welch_config(config.source.sample_rate)?;
            tracing::info!(
                "Spectral transform: {} window, {} bins, {} overlap",
                welch.window,
                welch.segment_len,
                welch.overlap
            );
            Ok(Self::spectral(hub, welch)?)
        } else {
            tracing::info!("Spectral transform disabled, forwarding raw magnitudes");
            Ok(Self::raw(hub, config.transform.precision))
        }
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Compute the payload for one frame on the blocking pool
    pub async fn process(&self, frame: SampleFrame) -> Result<Payload> {
        let estimator = self.estimator.clone();
        let precision = self.precision;

        tokio::task::spawn_blocking(move || match estimator {
            Some(estimator) => estimator
                .estimate(&frame.samples)
                .map(Payload::Spectrum)
                .map_err(Error::from),
            None => Ok(Payload::Raw(raw_magnitudes(&frame.samples, precision))),
        })
        .await
        .map_err(|e| Error::Sampler(SamplerError::TaskFailed(e.to_string())))?
    }
}

#[async_trait]
impl FrameSink for Pipeline {
    async fn consume(&self, frame: SampleFrame) -> Control {
        let sequence = frame.sequence;

        let encoded = match self.process(frame).await.and_then(|payload| payload.encode()) {
            Ok(encoded) => encoded,
            Err(e) => return Control::Error(e),
        };

        let report = self.hub.publish(&encoded).await;
        tracing::debug!(
            "Frame {} ({} bytes): {} delivered, {} skipped, {} reaped",
            sequence,
            encoded.len(),
            report.delivered,
            report.skipped,
            report.reaped
        );

        Control::Continue
    }
}
