//! Raw IQ sample frames

use chrono::{DateTime, Utc};
use rustfft::num_complex::Complex64;

/// One buffer of complex samples captured atomically from a source
#[derive(Debug, Clone)]
pub struct SampleFrame {
    /// Complex IQ samples in capture order
    pub samples: Vec<Complex64>,
    /// Sample rate the frame was captured at, in Hz
    pub sample_rate: f64,
    /// Tuner center frequency, in Hz
    pub center_freq: f64,
    /// Frame sequence number, starting at 0 for each start of the source
    pub sequence: u64,
    /// Wall-clock capture time
    pub captured_at: DateTime<Utc>,
}

impl SampleFrame {
    pub fn new(samples: Vec<Complex64>, sample_rate: f64, center_freq: f64, sequence: u64) -> Self {
        Self {
            samples,
            sample_rate,
            center_freq,
            sequence,
            captured_at: Utc::now(),
        }
    }

    /// Number of complex samples in the frame
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Frame duration in microseconds
    pub fn duration_us(&self) -> u64 {
        if self.sample_rate <= 0.0 {
            return 0;
        }
        (self.samples.len() as f64 * 1_000_000.0 / self.sample_rate) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_duration() {
        let frame = SampleFrame::new(vec![Complex64::new(0.0, 0.0); 1200], 1.2e6, 102e6, 0);
        assert_eq!(frame.len(), 1200);
        assert_eq!(frame.duration_us(), 1000);
    }

    #[test]
    fn test_empty_frame() {
        let frame = SampleFrame::new(Vec::new(), 0.0, 0.0, 3);
        assert!(frame.is_empty());
        assert_eq!(frame.duration_us(), 0);
    }
}
