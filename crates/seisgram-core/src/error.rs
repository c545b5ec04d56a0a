//! Error types for DSP primitives.

use thiserror::Error;

/// Errors raised when a DSP building block is configured or fed invalid data.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DspError {
    /// The signal has no samples.
    #[error("signal is empty")]
    EmptySignal,

    /// The signal contains NaN or infinite samples.
    #[error("signal contains a non-finite sample at index {index}")]
    NonFinite {
        /// Index of the first offending sample.
        index: usize,
    },

    /// A sample rate is zero, negative, or not finite.
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(f64),

    /// Bandpass corners are out of order or outside the representable band.
    #[error("invalid band [{low_hz}, {high_hz}] Hz for Nyquist {nyquist_hz} Hz")]
    InvalidBand {
        /// Lower corner in Hz.
        low_hz: f64,
        /// Upper corner in Hz.
        high_hz: f64,
        /// Nyquist frequency of the input in Hz.
        nyquist_hz: f64,
    },

    /// Butterworth order must be a positive even number.
    #[error("invalid filter order {0}: must be a positive even number")]
    InvalidOrder(usize),
}

/// Scan a signal for the first non-finite sample.
pub fn check_finite(signal: &[f64]) -> Result<(), DspError> {
    match signal.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(DspError::NonFinite { index }),
        None => Ok(()),
    }
}
