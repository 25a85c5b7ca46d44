//! Error types for the spectrum streamer

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Sampler error: {0}")]
    Sampler(#[from] SamplerError),

    #[error("Subscriber error: {0}")]
    Subscriber(#[from] SubscriberError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sample source errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Source already started")]
    AlreadyStarted,

    #[error("Source not started")]
    NotStarted,

    #[error("Read interrupted by stop")]
    Interrupted,

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Reader thread exited unexpectedly")]
    Disconnected,
}

/// Spectral transform errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Insufficient samples: got {got}, need at least {required}")]
    InsufficientSamples { got: usize, required: usize },

    #[error("Unknown window function: {0}")]
    UnknownWindow(String),

    #[error("Invalid transform configuration: {0}")]
    InvalidConfig(String),
}

/// Sampling loop errors
#[derive(Error, Debug)]
pub enum SamplerError {
    #[error("Sampler already started")]
    AlreadyStarted,

    #[error("Sampler not started")]
    NotStarted,

    #[error("Sampling task failed: {0}")]
    TaskFailed(String),
}

/// Per-subscriber delivery errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberError {
    #[error("Subscriber connection closed")]
    Closed,

    #[error("Subscriber still busy with a previous frame")]
    Backpressure,
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
