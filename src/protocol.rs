//! Wire types sent to subscribers and returned by the status API

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;

/// Power spectral density estimate for one frame.
///
/// Bin layout is the two-sided FFT order, *not* globally sorted:
///
/// ```text
/// [0, df, 2df, ..., Nyquist - df, -Nyquist, ..., -df]
/// ```
///
/// Consumers that want a monotonic axis must rotate both vectors by
/// `len / 2`. Frequencies are baseband offsets from the tuner center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralEstimate {
    /// Bin frequencies in Hz
    #[serde(rename = "f")]
    pub frequencies: Vec<f64>,
    /// Power spectral density per bin, never negative
    #[serde(rename = "Pxx")]
    pub power: Vec<f64>,
}

impl SpectralEstimate {
    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }

    /// Frequency of the strongest bin
    pub fn peak_frequency(&self) -> Option<f64> {
        self.power
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| self.frequencies[i])
    }
}

/// One message published to every subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// Magnitudes of the raw IQ samples
    Raw(Vec<f64>),
    /// Welch PSD estimate
    Spectrum(SpectralEstimate),
}

impl Payload {
    /// Serialize once so every subscriber shares the same text
    pub fn encode(&self) -> Result<EncodedPayload> {
        let text = serde_json::to_string(self)?;
        Ok(EncodedPayload(Arc::from(text)))
    }
}

/// A payload already serialized to JSON, cheap to clone per subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload(Arc<str>);

impl EncodedPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for EncodedPayload {
    fn from(text: &str) -> Self {
        Self(Arc::from(text))
    }
}

/// Sampling loop state as reported to observers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplerState {
    #[default]
    Idle,
    Running,
    Stopping,
}

/// System status returned by `/api/status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub sampler: SamplerState,
    pub subscribers: usize,
    pub frames_published: u64,
    pub uptime_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spectrum_wire_format() {
        let payload = Payload::Spectrum(SpectralEstimate {
            frequencies: vec![0.0, 250.0, -500.0, -250.0],
            power: vec![1.5, 0.25, 0.0, 2.0],
        });
        let encoded = payload.encode().unwrap();
        assert_eq!(
            encoded.as_str(),
            r#"{"f":[0.0,250.0,-500.0,-250.0],"Pxx":[1.5,0.25,0.0,2.0]}"#
        );
    }

    #[test]
    fn test_raw_wire_format() {
        let encoded = Payload::Raw(vec![1.0, 0.5]).encode().unwrap();
        assert_eq!(encoded.as_str(), "[1.0,0.5]");
    }

    #[test]
    fn test_peak_frequency() {
        let estimate = SpectralEstimate {
            frequencies: vec![0.0, 10.0, -20.0, -10.0],
            power: vec![0.1, 0.2, 0.0, 3.0],
        };
        assert_eq!(estimate.peak_frequency(), Some(-10.0));

        let empty = SpectralEstimate {
            frequencies: vec![],
            power: vec![],
        };
        assert_eq!(empty.peak_frequency(), None);
    }

    #[test]
    fn test_sampler_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SamplerState::Running).unwrap(), "\"running\"");
    }
}
