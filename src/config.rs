//! Application configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an
//! absent file or a partial file is fine. Nothing here is hot-reloaded.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::*;
use crate::dsp::{Window, WelchConfig};
use crate::error::{Error, Result, TransformError};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub transform: TransformConfig,
    pub sampler: SamplerConfig,
    pub server: ServerConfig,
}

/// Which driver backs the sample source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Synthetic tone generator
    Tone,
    /// Replay of a capture file written by `dump-samples`
    Replay,
}

/// Tuner gain setting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GainMode {
    Auto,
    /// Fixed gain in dB
    Manual(f64),
}

/// Sample source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Sample rate in Hz
    pub sample_rate: f64,
    /// Center frequency in Hz
    pub center_freq: f64,
    pub gain: GainMode,
    /// Complex samples per frame
    pub samples_per_frame: usize,
    /// Capture file for the replay source
    pub replay_path: Option<PathBuf>,
    /// Baseband tone offsets (Hz) produced by the tone source
    pub tone_offsets: Vec<f64>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Tone,
            sample_rate: DEFAULT_SAMPLE_RATE,
            center_freq: DEFAULT_CENTER_FREQ,
            gain: GainMode::Auto,
            samples_per_frame: DEFAULT_SAMPLES_PER_FRAME,
            replay_path: None,
            tone_offsets: vec![100_000.0, -250_000.0],
        }
    }
}

/// Spectral transform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// When false, raw sample magnitudes are forwarded instead
    pub enabled: bool,
    /// Window function name
    pub window: String,
    /// Welch segment length (output bin count)
    pub segment_len: usize,
    /// Samples shared by consecutive segments, defaults to half a segment
    pub overlap: Option<usize>,
    /// Decimal places kept in transmitted values
    pub precision: u32,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: "flattop".to_string(),
            segment_len: DEFAULT_SEGMENT_LEN,
            overlap: None,
            precision: DEFAULT_PRECISION,
        }
    }
}

impl TransformConfig {
    /// Build the Welch parameters for frames captured at `sample_rate`
    pub fn welch_config(&self, sample_rate: f64) -> std::result::Result<WelchConfig, TransformError> {
        let window: Window = self.window.parse()?;
        let config = WelchConfig {
            sample_rate,
            window,
            segment_len: self.segment_len,
            overlap: self.overlap.unwrap_or(self.segment_len / 2),
            precision: self.precision,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Sampling loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Pause between consecutive frames, in milliseconds
    pub delay_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_FRAME_DELAY_MS,
        }
    }
}

impl SamplerConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// HTTP / WebSocket server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub http_port: u16,
    /// Directory served under `/static`, if any
    pub static_dir: Option<PathBuf>,
    /// Payloads that may wait in one subscriber's outbound slot
    pub outbound_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            http_port: DEFAULT_HTTP_PORT,
            static_dir: None,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from the platform config dir when `path` is None.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    let config = Self::default();
                    config.validate()?;
                    Ok(config)
                }
            },
        }
    }

    /// Parse and validate a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// `<config dir>/spectrum-streamer/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "websdr", "spectrum-streamer")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.source.sample_rate > 0.0) {
            return Err(Error::Config(format!(
                "sample_rate must be positive, got {}",
                self.source.sample_rate
            )));
        }
        if self.source.samples_per_frame == 0 {
            return Err(Error::Config("samples_per_frame must be non-zero".into()));
        }
        if self.source.kind == SourceKind::Replay && self.source.replay_path.is_none() {
            return Err(Error::Config("replay source requires replay_path".into()));
        }
        if self.server.outbound_capacity == 0 {
            return Err(Error::Config("outbound_capacity must be non-zero".into()));
        }
        self.transform
            .welch_config(self.source.sample_rate)
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sampler.delay(), Duration::from_secs(1));
        assert_eq!(config.transform.window, "flattop");
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            [source]
            sample_rate = 2.4e6
            gain = { manual = 19.7 }

            [transform]
            window = "hann"
            segment_len = 512

            [sampler]
            delay_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.source.sample_rate, 2.4e6);
        assert_eq!(config.source.gain, GainMode::Manual(19.7));
        assert_eq!(config.source.center_freq, DEFAULT_CENTER_FREQ);
        assert_eq!(config.transform.segment_len, 512);
        assert_eq!(config.sampler.delay(), Duration::from_millis(250));
        assert_eq!(config.server.http_port, DEFAULT_HTTP_PORT);
    }

    #[test]
    fn test_auto_gain_parses() {
        let config = AppConfig::from_toml("[source]\ngain = \"auto\"\n").unwrap();
        assert_eq!(config.source.gain, GainMode::Auto);
    }

    #[test]
    fn test_unknown_window_rejected() {
        let err = AppConfig::from_toml("[transform]\nwindow = \"kaiser-bessel\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_overlap_must_be_below_segment() {
        let err = AppConfig::from_toml("[transform]\nsegment_len = 64\noverlap = 64\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_excessive_precision_rejected() {
        let err = AppConfig::from_toml("[transform]\nprecision = 400\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        // Raw mode uses the same precision
        let err = AppConfig::from_toml("[transform]\nenabled = false\nprecision = 16\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let config = AppConfig::from_toml("[transform]\nprecision = 15\n").unwrap();
        assert_eq!(config.transform.precision, MAX_PRECISION);
    }

    #[test]
    fn test_replay_requires_path() {
        let err = AppConfig::from_toml("[source]\nkind = \"replay\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_welch_config_defaults_overlap_to_half() {
        let welch = TransformConfig::default().welch_config(1.2e6).unwrap();
        assert_eq!(welch.overlap, DEFAULT_SEGMENT_LEN / 2);
        assert_eq!(welch.window, Window::Flattop);
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nhttp_port = 9123\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.server.http_port, 9123);

        let missing = dir.path().join("missing.toml");
        assert!(matches!(AppConfig::load(Some(&missing)), Err(Error::Io(_))));
    }
}
