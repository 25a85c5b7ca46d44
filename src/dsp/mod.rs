//! Spectral transform stage
//!
//! Turns a raw IQ frame into a Welch power spectral density estimate.

pub mod welch;
pub mod window;

pub use welch::{raw_magnitudes, welch, WelchConfig, WelchEstimator};
pub use window::Window;
