//! Signal conditioning chain applied to each raw day chunk.
//!
//! The order is fixed: linear detrend, demean, bandpass, resample. The trend
//! and offset must be gone before the IIR bandpass sees the signal, and the
//! bandpass runs at the native rate so its corners are checked against the
//! native Nyquist.

use crate::resample::{ResampleError, rational_ratio, resample};
use seisgram_core::{
    BandpassFilter, ConditionedTrace, DspError, WaveformChunk, check_finite, demean,
    detrend_linear,
};
use thiserror::Error;

/// Why a chunk could not be conditioned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PreprocessError {
    /// Input had no samples.
    #[error("chunk is empty")]
    Empty,

    /// Filter design or input validation failed.
    #[error(transparent)]
    Dsp(#[from] DspError),

    /// The canonical rate is not reachable from the native rate.
    #[error(transparent)]
    Resample(#[from] ResampleError),
}

/// Conditioning parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
    /// Lower bandpass corner in Hz.
    pub freq_min: f64,
    /// Upper bandpass corner in Hz.
    pub freq_max: f64,
    /// Butterworth order (even).
    pub corners: usize,
    /// Run the bandpass forward and backward.
    pub zero_phase: bool,
    /// Canonical output rate in Hz.
    pub target_rate: f64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            freq_min: 1.0,
            freq_max: 4.0,
            corners: 4,
            zero_phase: false,
            target_rate: 8.0,
        }
    }
}

/// Detrend → demean → bandpass → resample.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    /// Create a preprocessor.
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Parameters in use.
    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Condition one chunk.
    pub fn process(&self, chunk: &WaveformChunk) -> Result<ConditionedTrace, PreprocessError> {
        if chunk.is_empty() {
            return Err(PreprocessError::Empty);
        }
        check_finite(&chunk.samples)?;

        let native_rate = chunk.sample_rate;
        let mut filter = BandpassFilter::new(
            self.config.freq_min,
            self.config.freq_max,
            self.config.corners,
            native_rate,
        )?;
        let (p, q) = rational_ratio(native_rate, self.config.target_rate)?;

        let mut samples = chunk.samples.clone();
        detrend_linear(&mut samples);
        demean(&mut samples);

        let filtered = if self.config.zero_phase {
            filter.filter_zero_phase(&samples)
        } else {
            filter.filter(&samples)
        };

        let resampled = resample(&filtered, p, q, 0);

        Ok(ConditionedTrace::new(
            chunk.stream.clone(),
            self.config.target_rate,
            chunk.start,
            resampled,
        ))
    }
}
