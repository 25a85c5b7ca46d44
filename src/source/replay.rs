//! Capture file replay
//!
//! A capture file is a flat run of little-endian `f64` pairs, I then Q,
//! one pair per complex sample. `dump-samples` writes them; the replay
//! source loops over one.

use bytes::{Buf, BufMut, BytesMut};
use rustfft::num_complex::Complex64;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use crate::config::SourceConfig;
use crate::error::SourceError;
use crate::source::driver::SampleSource;

/// Bytes per complex sample in a capture file
pub const BYTES_PER_SAMPLE: usize = 16;

pub struct ReplaySource {
    path: PathBuf,
    samples: Vec<Complex64>,
    position: usize,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            samples: Vec::new(),
            position: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleSource for ReplaySource {
    fn name(&self) -> &str {
        "replay"
    }

    fn open(&mut self, _config: &SourceConfig) -> Result<(), SourceError> {
        let data = std::fs::read(&self.path).map_err(|e| {
            SourceError::DeviceUnavailable(format!("{}: {}", self.path.display(), e))
        })?;

        let samples = decode_capture(&data);
        if samples.is_empty() {
            return Err(SourceError::DeviceUnavailable(format!(
                "{}: no complete samples",
                self.path.display()
            )));
        }

        tracing::info!(
            "Replaying {} samples from {}",
            samples.len(),
            self.path.display()
        );
        self.samples = samples;
        self.position = 0;
        Ok(())
    }

    fn read(
        &mut self,
        num_samples: usize,
        _running: &AtomicBool,
    ) -> Result<Vec<Complex64>, SourceError> {
        if self.samples.is_empty() {
            return Err(SourceError::ReadFailed("replay source is closed".into()));
        }

        let mut out = Vec::with_capacity(num_samples);
        while out.len() < num_samples {
            let take = (num_samples - out.len()).min(self.samples.len() - self.position);
            out.extend_from_slice(&self.samples[self.position..self.position + take]);
            self.position = (self.position + take) % self.samples.len();
        }
        Ok(out)
    }

    fn close(&mut self) {
        self.samples = Vec::new();
        self.position = 0;
    }
}

/// Decode a capture, ignoring a trailing partial sample
pub fn decode_capture(data: &[u8]) -> Vec<Complex64> {
    let mut buf = &data[..data.len() - data.len() % BYTES_PER_SAMPLE];
    let mut samples = Vec::with_capacity(buf.len() / BYTES_PER_SAMPLE);
    while buf.has_remaining() {
        let re = buf.get_f64_le();
        let im = buf.get_f64_le();
        samples.push(Complex64::new(re, im));
    }
    samples
}

/// Encode samples in capture file layout
pub fn encode_capture(samples: &[Complex64]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for sample in samples {
        buf.put_f64_le(sample.re);
        buf.put_f64_le(sample.im);
    }
    buf
}

/// Write samples to a capture file
pub fn write_capture(path: &Path, samples: &[Complex64]) -> std::io::Result<()> {
    std::fs::write(path, encode_capture(samples))
}
