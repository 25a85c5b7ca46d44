//! Driver seam for sampling hardware

use rustfft::num_complex::Complex64;
use std::sync::atomic::AtomicBool;

use crate::config::SourceConfig;
use crate::error::SourceError;

/// A blocking sample driver.
///
/// Implementations own the physical device (or its stand-in). They are
/// driven from a dedicated reader thread, so `read` may block on I/O.
pub trait SampleSource: Send + 'static {
    /// Short human-readable driver name for logs
    fn name(&self) -> &str;

    /// Acquire and configure the device
    fn open(&mut self, config: &SourceConfig) -> Result<(), SourceError>;

    /// Block until `num_samples` complex samples are available.
    ///
    /// `running` goes false when the adapter is stopping. A driver that can
    /// block for long must poll it and give up with
    /// `SourceError::Interrupted`.
    fn read(
        &mut self,
        num_samples: usize,
        running: &AtomicBool,
    ) -> Result<Vec<Complex64>, SourceError>;

    /// Release the device. Called exactly once per successful `open`.
    fn close(&mut self);
}
