//! # Spectrum Streamer
//!
//! Pulls complex baseband samples from a radio source at a throttled rate,
//! turns each frame into a Welch power spectral density estimate and pushes
//! the result to every connected WebSocket client.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          SOURCE (source::*)                          │
//! │  ┌──────────────┐     requests      ┌──────────────────────────────┐ │
//! │  │ SourceAdapter│ ───────────────▶  │ Driver thread                │ │
//! │  │  (async)     │ ◀───────────────  │ ToneSource / ReplaySource    │ │
//! │  └──────┬───────┘    SampleFrame    └──────────────────────────────┘ │
//! └─────────┼────────────────────────────────────────────────────────────┘
//!           │ pull, one frame at a time
//!           ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                Sampler (sampler::throttled) - one task               │
//! │      pull ─▶ sink.consume(frame) ─▶ sleep(delay) ─▶ pull ...         │
//! └─────────┬────────────────────────────────────────────────────────────┘
//!           ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  Pipeline (sampler::pipeline)                                        │
//! │    Welch PSD (dsp::welch) or raw magnitudes ─▶ JSON {f, Pxx}         │
//! └─────────┬────────────────────────────────────────────────────────────┘
//!           ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  Hub (hub::broadcast) ─▶ WsSubscriber ─▶ /sde WebSocket clients      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod config;
pub mod dsp;
pub mod error;
pub mod hub;
pub mod protocol;
pub mod sampler;
pub mod source;
pub mod web;

pub use app::Application;
pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Default sample rate in Hz
    pub const DEFAULT_SAMPLE_RATE: f64 = 1.2e6;

    /// Default center frequency in Hz
    pub const DEFAULT_CENTER_FREQ: f64 = 102e6;

    /// Complex samples read per frame
    pub const DEFAULT_SAMPLES_PER_FRAME: usize = 128 * 1024;

    /// Welch segment length, which is also the output bin count
    pub const DEFAULT_SEGMENT_LEN: usize = 1024;

    /// Decimal places kept in transmitted values
    pub const DEFAULT_PRECISION: u32 = 9;

    /// Most decimal places an f64 can carry meaningfully
    pub const MAX_PRECISION: u32 = 15;

    /// Pause between frames in milliseconds
    pub const DEFAULT_FRAME_DELAY_MS: u64 = 1000;

    /// Default HTTP / WebSocket port
    pub const DEFAULT_HTTP_PORT: u16 = 8000;

    /// Payloads that may queue for one slow subscriber
    pub const DEFAULT_OUTBOUND_CAPACITY: usize = 2;

    /// Frames a subscriber may miss in a row before it is dropped
    pub const MAX_CONSECUTIVE_SKIPS: u32 = 30;
}
