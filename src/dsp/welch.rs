//! Welch power spectral density estimation
//!
//! Splits a frame into overlapping segments, removes each segment's mean,
//! applies the window, and averages the scaled periodograms. Output is
//! two-sided with one bin per segment sample.

use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::dsp::window::Window;
use crate::error::TransformError;
use crate::protocol::SpectralEstimate;

/// Parameters for one Welch estimate
#[derive(Debug, Clone, PartialEq)]
pub struct WelchConfig {
    /// Sampling frequency in Hz
    pub sample_rate: f64,
    pub window: Window,
    /// Samples per segment, and the number of output bins
    pub segment_len: usize,
    /// Samples shared between consecutive segments
    pub overlap: usize,
    /// Decimal places kept in the output
    pub precision: u32,
}

impl WelchConfig {
    pub fn new(sample_rate: f64, window: Window, segment_len: usize) -> Self {
        Self {
            sample_rate,
            window,
            segment_len,
            overlap: segment_len / 2,
            precision: crate::constants::DEFAULT_PRECISION,
        }
    }

    pub fn validate(&self) -> Result<(), TransformError> {
        if self.segment_len == 0 {
            return Err(TransformError::InvalidConfig("segment_len must be non-zero".into()));
        }
        if self.overlap >= self.segment_len {
            return Err(TransformError::InvalidConfig(format!(
                "overlap {} must be smaller than segment_len {}",
                self.overlap, self.segment_len
            )));
        }
        if self.precision > crate::constants::MAX_PRECISION {
            return Err(TransformError::InvalidConfig(format!(
                "precision {} exceeds the maximum of {} decimal places",
                self.precision,
                crate::constants::MAX_PRECISION
            )));
        }
        if !(self.sample_rate > 0.0) {
            return Err(TransformError::InvalidConfig(format!(
                "sample_rate must be positive, got {}",
                self.sample_rate
            )));
        }
        Ok(())
    }
}

/// Welch estimator with the FFT plan and window precomputed.
///
/// Holds no per-frame state: the same input always yields the same output.
pub struct WelchEstimator {
    config: WelchConfig,
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
    frequencies: Vec<f64>,
    /// Density scaling, 1 / (fs * sum(w^2))
    scale: f64,
}

impl WelchEstimator {
    pub fn new(config: WelchConfig) -> Result<Self, TransformError> {
        config.validate()?;

        let n = config.segment_len;
        let window = config.window.generate(n);
        let power: f64 = window.iter().map(|w| w * w).sum();
        if power <= 0.0 {
            return Err(TransformError::InvalidConfig(format!(
                "{} window of length {} has no energy",
                config.window, n
            )));
        }
        let scale = 1.0 / (config.sample_rate * power);

        let frequencies = fft_frequencies(n, config.sample_rate)
            .into_iter()
            .map(|f| round_to(f, config.precision))
            .collect();

        let fft = FftPlanner::new().plan_fft_forward(n);

        Ok(Self {
            config,
            fft,
            window,
            frequencies,
            scale,
        })
    }

    pub fn config(&self) -> &WelchConfig {
        &self.config
    }

    /// Estimate the PSD of `samples`.
    ///
    /// A buffer shorter than one segment is zero-padded to a full segment.
    /// An empty buffer is rejected.
    pub fn estimate(&self, samples: &[Complex64]) -> Result<SpectralEstimate, TransformError> {
        if samples.is_empty() {
            return Err(TransformError::InsufficientSamples {
                got: 0,
                required: 1,
            });
        }

        let n = self.config.segment_len;
        let padded;
        let samples = if samples.len() < n {
            let mut buf = samples.to_vec();
            buf.resize(n, Complex64::new(0.0, 0.0));
            padded = buf;
            &padded[..]
        } else {
            samples
        };

        let step = n - self.config.overlap;
        let segments = (samples.len() - self.config.overlap) / step;

        let mut accumulated = vec![0.0f64; n];
        let mut buffer = vec![Complex64::new(0.0, 0.0); n];
        let mut scratch = vec![Complex64::new(0.0, 0.0); self.fft.get_inplace_scratch_len()];

        for segment in 0..segments {
            let start = segment * step;
            let chunk = &samples[start..start + n];

            let mean = chunk.iter().sum::<Complex64>() / n as f64;
            for ((slot, &x), &w) in buffer.iter_mut().zip(chunk).zip(&self.window) {
                *slot = (x - mean) * w;
            }

            self.fft.process_with_scratch(&mut buffer, &mut scratch);

            for (acc, bin) in accumulated.iter_mut().zip(&buffer) {
                *acc += bin.norm_sqr();
            }
        }

        let norm = self.scale / segments as f64;
        let power = accumulated
            .into_iter()
            .map(|p| round_to(p * norm, self.config.precision).abs())
            .collect();

        Ok(SpectralEstimate {
            frequencies: self.frequencies.clone(),
            power,
        })
    }
}

/// One-off Welch estimate
pub fn welch(samples: &[Complex64], config: &WelchConfig) -> Result<SpectralEstimate, TransformError> {
    WelchEstimator::new(config.clone())?.estimate(samples)
}

/// Magnitudes of raw samples, rounded for transmission
pub fn raw_magnitudes(samples: &[Complex64], precision: u32) -> Vec<f64> {
    samples.iter().map(|s| round_to(s.norm(), precision)).collect()
}

/// Bin center frequencies in FFT order: non-negative bins, then negative
fn fft_frequencies(n: usize, sample_rate: f64) -> Vec<f64> {
    let df = sample_rate / n as f64;
    let positive = n.div_ceil(2);
    (0..n)
        .map(|i| {
            let k = if i < positive { i as f64 } else { i as f64 - n as f64 };
            k * df
        })
        .collect()
}

fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    fn cosine(f0: f64, fs: f64, len: usize) -> Vec<Complex64> {
        (0..len)
            .map(|i| Complex64::new((2.0 * PI * f0 * i as f64 / fs).cos(), 0.0))
            .collect()
    }

    fn tone(f0: f64, fs: f64, len: usize) -> Vec<Complex64> {
        (0..len)
            .map(|i| Complex64::from_polar(1.0, 2.0 * PI * f0 * i as f64 / fs))
            .collect()
    }

    #[test]
    fn test_fft_frequency_layout() {
        assert_eq!(fft_frequencies(4, 8.0), vec![0.0, 2.0, -4.0, -2.0]);
        assert_eq!(fft_frequencies(5, 5.0), vec![0.0, 1.0, 2.0, -2.0, -1.0]);
    }

    #[test]
    fn test_cosine_peak_at_f0() {
        let fs = 1000.0;
        let f0 = 125.0;
        let config = WelchConfig::new(fs, Window::Hann, 256);
        let estimate = welch(&cosine(f0, fs, 4096), &config).unwrap();

        let bin_width = fs / 256.0;
        let peak = estimate.peak_frequency().unwrap();
        // a real cosine shows up at both +f0 and -f0
        assert!((peak.abs() - f0).abs() <= bin_width, "peak at {}", peak);
    }

    #[test]
    fn test_complex_tone_peak_is_signed() {
        let fs = 1.2e6;
        let f0 = -250_000.0;
        let config = WelchConfig::new(fs, Window::Flattop, 1024);
        let estimate = welch(&tone(f0, fs, 16 * 1024), &config).unwrap();

        let bin_width = fs / 1024.0;
        let peak = estimate.peak_frequency().unwrap();
        assert!((peak - f0).abs() <= bin_width, "peak at {}", peak);
    }

    #[test]
    fn test_output_length_matches_segment() {
        let config = WelchConfig::new(48_000.0, Window::Blackman, 128);
        let estimate = welch(&tone(1000.0, 48_000.0, 1000), &config).unwrap();
        assert_eq!(estimate.frequencies.len(), 128);
        assert_eq!(estimate.power.len(), 128);
    }

    #[test]
    fn test_short_buffer_is_zero_padded() {
        let config = WelchConfig::new(1000.0, Window::Hann, 64);
        let short = tone(100.0, 1000.0, 40);

        let first = welch(&short, &config).unwrap();
        let second = welch(&short, &config).unwrap();
        assert_eq!(first.len(), 64);
        assert_eq!(first, second);

        let mut padded = short.clone();
        padded.resize(64, Complex64::new(0.0, 0.0));
        assert_eq!(first, welch(&padded, &config).unwrap());
    }

    #[test]
    fn test_empty_buffer_rejected() {
        let config = WelchConfig::new(1000.0, Window::Hann, 64);
        assert_eq!(
            welch(&[], &config),
            Err(TransformError::InsufficientSamples { got: 0, required: 1 })
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = WelchConfig::new(1000.0, Window::Hann, 0);
        assert!(matches!(WelchEstimator::new(config.clone()), Err(TransformError::InvalidConfig(_))));

        config.segment_len = 32;
        config.overlap = 32;
        assert!(matches!(WelchEstimator::new(config.clone()), Err(TransformError::InvalidConfig(_))));

        config.overlap = 0;
        config.sample_rate = 0.0;
        assert!(matches!(WelchEstimator::new(config), Err(TransformError::InvalidConfig(_))));
    }

    #[test]
    fn test_precision_bounded() {
        let mut config = WelchConfig::new(1000.0, Window::Hann, 32);
        config.precision = crate::constants::MAX_PRECISION;
        let estimate = welch(&cosine(100.0, 1000.0, 256), &config).unwrap();
        assert!(estimate.power.iter().chain(&estimate.frequencies).all(|v| v.is_finite()));

        config.precision = 400;
        assert!(matches!(
            WelchEstimator::new(config),
            Err(TransformError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_dc_offset_removed() {
        // constant input is all mean, so detrending leaves nothing
        let config = WelchConfig::new(1000.0, Window::Boxcar, 32);
        let estimate = welch(&vec![Complex64::new(3.0, -1.0); 128], &config).unwrap();
        assert!(estimate.power.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_density_scaling_white_signal() {
        // unit-power alternating sequence with a boxcar window puts all
        // energy in the Nyquist bin: psd = |X|^2 / (fs * n) = n / fs
        let fs = 100.0;
        let n = 16;
        let samples: Vec<Complex64> = (0..n * 4)
            .map(|i| Complex64::new(if i % 2 == 0 { 1.0 } else { -1.0 }, 0.0))
            .collect();
        let config = WelchConfig::new(fs, Window::Boxcar, n);
        let estimate = welch(&samples, &config).unwrap();

        let nyquist = n / 2;
        assert_eq!(estimate.frequencies[nyquist], -50.0);
        assert!((estimate.power[nyquist] - n as f64 / fs).abs() < 1e-9);
    }

    #[test]
    fn test_values_rounded() {
        let mut config = WelchConfig::new(1000.0, Window::Hann, 64);
        config.precision = 3;
        let estimate = welch(&tone(123.0, 1000.0, 256), &config).unwrap();
        for p in &estimate.power {
            assert!(((p * 1000.0).round() - p * 1000.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_raw_magnitudes() {
        let samples = vec![Complex64::new(3.0, 4.0), Complex64::new(-1.0, 0.0)];
        assert_eq!(raw_magnitudes(&samples, 9), vec![5.0, 1.0]);
    }

    proptest! {
        #[test]
        fn prop_lengths_equal_segment(
            len in 1usize..2048,
            segment_exp in 2u32..10,
            window_idx in 0usize..5,
        ) {
            let windows = [Window::Boxcar, Window::Hann, Window::Hamming, Window::Blackman, Window::Flattop];
            let segment_len = 1usize << segment_exp;
            let config = WelchConfig::new(1.2e6, windows[window_idx], segment_len);
            let samples: Vec<Complex64> = (0..len)
                .map(|i| Complex64::new((i as f64 * 0.37).sin(), (i as f64 * 0.11).cos()))
                .collect();

            let estimate = welch(&samples, &config).unwrap();
            prop_assert_eq!(estimate.frequencies.len(), segment_len);
            prop_assert_eq!(estimate.power.len(), segment_len);
            prop_assert!(estimate.power.iter().all(|&p| p >= 0.0));
        }
    }
}
