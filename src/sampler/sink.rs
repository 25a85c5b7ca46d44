//! Per-frame consumer seam of the sampling loop

use async_trait::async_trait;

use crate::error::Error;
use crate::source::SampleFrame;

/// What the sampling loop should do after a frame was consumed
#[derive(Debug)]
pub enum Control {
    /// Pull the next frame after the inter-frame delay
    Continue,
    /// Halt the loop and release the source
    Stop,
    /// This frame was dropped; keep going
    Error(Error),
}

/// Receives every frame the sampling loop pulls
#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn consume(&self, frame: SampleFrame) -> Control;
}
