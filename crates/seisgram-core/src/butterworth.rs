//! Butterworth bandpass built from cascaded second-order sections.
//!
//! A bandpass of order `n` is realized as `n / 2` high-pass sections at the
//! lower corner followed by `n / 2` low-pass sections at the upper corner.
//! Section Q values follow the Butterworth pole angles:
//!
//! ```text
//! Q_k = 1 / (2 cos((2k - 1) π / (2n)))    k = 1..n/2
//! ```
//!
//! For the default order 4 this gives Q = 0.541 and Q = 1.307.

use crate::biquad::{Biquad, highpass_coefficients, lowpass_coefficients};
use crate::error::DspError;
use std::f64::consts::PI;

/// Butterworth section Q factors for an even order.
pub fn section_qs(order: usize) -> Vec<f64> {
    let sections = order / 2;
    (1..=sections)
        .map(|k| 1.0 / (2.0 * ((2 * k - 1) as f64 * PI / (2 * order) as f64).cos()))
        .collect()
}

/// Cascaded high-pass + low-pass Butterworth bandpass.
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    highpass: Vec<Biquad>,
    lowpass: Vec<Biquad>,
    low_hz: f64,
    high_hz: f64,
    sample_rate: f64,
}

impl BandpassFilter {
    /// Design a bandpass for `[low_hz, high_hz]` at `sample_rate`.
    ///
    /// Rejects `low_hz <= 0`, `low_hz >= high_hz`, `high_hz >= Nyquist`, and
    /// orders that are zero or odd.
    pub fn new(low_hz: f64, high_hz: f64, order: usize, sample_rate: f64) -> Result<Self, DspError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }
        if order == 0 || order % 2 != 0 {
            return Err(DspError::InvalidOrder(order));
        }
        let nyquist_hz = sample_rate / 2.0;
        let band_ok = low_hz.is_finite()
            && high_hz.is_finite()
            && low_hz > 0.0
            && low_hz < high_hz
            && high_hz < nyquist_hz;
        if !band_ok {
            return Err(DspError::InvalidBand {
                low_hz,
                high_hz,
                nyquist_hz,
            });
        }

        let qs = section_qs(order);
        let highpass = qs
            .iter()
            .map(|&q| Biquad::with_coefficients(highpass_coefficients(low_hz, q, sample_rate)))
            .collect();
        let lowpass = qs
            .iter()
            .map(|&q| Biquad::with_coefficients(lowpass_coefficients(high_hz, q, sample_rate)))
            .collect();

        Ok(Self {
            highpass,
            lowpass,
            low_hz,
            high_hz,
            sample_rate,
        })
    }

    /// Lower corner in Hz.
    pub fn low_hz(&self) -> f64 {
        self.low_hz
    }

    /// Upper corner in Hz.
    pub fn high_hz(&self) -> f64 {
        self.high_hz
    }

    /// Sample rate the filter was designed for.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Process a single sample.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let mut sample = input;
        for hp in &mut self.highpass {
            sample = hp.process(sample);
        }
        for lp in &mut self.lowpass {
            sample = lp.process(sample);
        }
        sample
    }

    /// Reset all section states.
    pub fn reset(&mut self) {
        for section in self.highpass.iter_mut().chain(self.lowpass.iter_mut()) {
            section.clear();
        }
    }

    /// Causal single-pass filtering of a whole signal. State is reset first.
    pub fn filter(&mut self, signal: &[f64]) -> Vec<f64> {
        self.reset();
        signal.iter().map(|&x| self.process(x)).collect()
    }

    /// Zero-phase filtering: forward pass, then a backward pass over the
    /// reversed output. Doubles the effective order.
    pub fn filter_zero_phase(&mut self, signal: &[f64]) -> Vec<f64> {
        let mut forward = self.filter(signal);
        forward.reverse();
        let mut backward = self.filter(&forward);
        backward.reverse();
        self.reset();
        backward
    }
}
