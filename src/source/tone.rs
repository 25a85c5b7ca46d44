//! Synthetic tone source
//!
//! Generates phase-continuous complex tones at fixed baseband offsets.
//! Stands in for a tuner when no hardware is attached.

use rustfft::num_complex::Complex64;
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::config::{GainMode, SourceConfig};
use crate::error::SourceError;
use crate::source::driver::SampleSource;

/// Longest uninterrupted sleep while pacing a frame
const PACING_SLICE: Duration = Duration::from_millis(10);

pub struct ToneSource {
    /// Block for the real duration of each frame, like hardware would
    realtime: bool,
    sample_rate: f64,
    amplitude: f64,
    offsets: Vec<f64>,
    phases: Vec<f64>,
    open: bool,
}

impl ToneSource {
    /// Source paced at the configured sample rate
    pub fn realtime() -> Self {
        Self::new(true)
    }

    /// Source that returns frames as fast as they are requested
    pub fn unpaced() -> Self {
        Self::new(false)
    }

    fn new(realtime: bool) -> Self {
        Self {
            realtime,
            sample_rate: 0.0,
            amplitude: 1.0,
            offsets: Vec::new(),
            phases: Vec::new(),
            open: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl SampleSource for ToneSource {
    fn name(&self) -> &str {
        "tone"
    }

    fn open(&mut self, config: &SourceConfig) -> Result<(), SourceError> {
        if self.open {
            return Err(SourceError::DeviceUnavailable("tone source already open".into()));
        }

        self.sample_rate = config.sample_rate;
        self.amplitude = match config.gain {
            GainMode::Auto => 1.0,
            GainMode::Manual(db) => 10f64.powf(db / 20.0),
        };
        self.offsets = config.tone_offsets.clone();
        self.phases = vec![0.0; self.offsets.len()];
        self.open = true;

        tracing::debug!(
            "Tone source open: {} tones at {:.0} Hz",
            self.offsets.len(),
            self.sample_rate
        );
        Ok(())
    }

    fn read(
        &mut self,
        num_samples: usize,
        running: &AtomicBool,
    ) -> Result<Vec<Complex64>, SourceError> {
        if !self.open {
            return Err(SourceError::ReadFailed("tone source is closed".into()));
        }

        if self.realtime {
            let deadline =
                Instant::now() + Duration::from_secs_f64(num_samples as f64 / self.sample_rate);
            loop {
                if !running.load(Ordering::SeqCst) {
                    return Err(SourceError::Interrupted);
                }
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                std::thread::sleep((deadline - now).min(PACING_SLICE));
            }
        }

        let steps: Vec<f64> = self
            .offsets
            .iter()
            .map(|f| TAU * f / self.sample_rate)
            .collect();

        let mut samples = Vec::with_capacity(num_samples);
        for _ in 0..num_samples {
            let mut sample = Complex64::new(0.0, 0.0);
            for (phase, step) in self.phases.iter_mut().zip(&steps) {
                sample += Complex64::from_polar(self.amplitude, *phase);
                *phase = (*phase + step).rem_euclid(TAU);
            }
            samples.push(sample);
        }

        Ok(samples)
    }

    fn close(&mut self) {
        self.open = false;
    }
}
