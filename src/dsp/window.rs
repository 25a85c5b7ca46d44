//! Window functions for spectral estimation
//!
//! All windows are generated in their periodic (DFT-even) form, which is
//! what a segment-averaged PSD wants.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::error::TransformError;

/// Supported window functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Boxcar,
    Hann,
    Hamming,
    Blackman,
    Flattop,
}

impl Window {
    /// Cosine-sum coefficients a0, a1, ...
    fn coefficients(self) -> &'static [f64] {
        match self {
            Window::Boxcar => &[1.0],
            Window::Hann => &[0.5, 0.5],
            Window::Hamming => &[0.54, 0.46],
            Window::Blackman => &[0.42, 0.50, 0.08],
            Window::Flattop => &[
                0.215_578_95,
                0.416_631_58,
                0.277_263_158,
                0.083_578_947,
                0.006_947_368,
            ],
        }
    }

    /// Generate `len` periodic window coefficients
    pub fn generate(self, len: usize) -> Vec<f64> {
        if len == 0 {
            return Vec::new();
        }
        if len == 1 {
            return vec![1.0];
        }

        let coefficients = self.coefficients();
        (0..len)
            .map(|i| {
                let phase = 2.0 * PI * i as f64 / len as f64;
                coefficients
                    .iter()
                    .enumerate()
                    .map(|(k, a)| {
                        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                        sign * a * (k as f64 * phase).cos()
                    })
                    .sum()
            })
            .collect()
    }

    pub fn name(self) -> &'static str {
        match self {
            Window::Boxcar => "boxcar",
            Window::Hann => "hann",
            Window::Hamming => "hamming",
            Window::Blackman => "blackman",
            Window::Flattop => "flattop",
        }
    }
}

impl FromStr for Window {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boxcar" | "rectangular" | "rect" => Ok(Window::Boxcar),
            "hann" | "hanning" => Ok(Window::Hann),
            "hamming" => Ok(Window::Hamming),
            "blackman" => Ok(Window::Blackman),
            "flattop" | "flat_top" => Ok(Window::Flattop),
            _ => Err(TransformError::UnknownWindow(s.to_string())),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
