//! Seisgram Core - waveform data model and DSP primitives
//!
//! This crate provides the building blocks shared by every stage of the
//! seisgram feature pipeline.
//!
//! # Data Model
//!
//! - [`DateRange`] - End-exclusive range of UTC day starts
//! - [`StreamId`] - `NET.STA.LOC.CHA` identity, wildcard-aware
//! - [`WaveformChunk`] - One day of raw samples from an acquisition source
//! - [`ConditionedTrace`] - Detrended, filtered, resampled trace
//! - [`Segment`] - Fixed-length window cut from a conditioned trace
//!
//! # Acquisition Seam
//!
//! - [`WaveformSource`] - Trait for anything that can deliver a day chunk
//! - [`Acquisition`] - Explicit available / unavailable outcome
//!
//! # Filters
//!
//! - [`Biquad`] - Second-order IIR section with RBJ cookbook coefficients
//! - [`BandpassFilter`] - Butterworth bandpass from cascaded sections
//!
//! # Conditioning
//!
//! - [`detrend_linear`], [`demean`] - Trend and offset removal
//!
//! # Example
//!
//! ```rust
//! use seisgram_core::{BandpassFilter, demean, detrend_linear};
//!
//! let mut signal: Vec<f64> = (0..1000).map(|i| 0.5 * i as f64 + (i as f64).sin()).collect();
//! detrend_linear(&mut signal);
//! demean(&mut signal);
//!
//! let mut filter = BandpassFilter::new(1.0, 4.0, 4, 100.0).unwrap();
//! let filtered = filter.filter(&signal);
//! assert_eq!(filtered.len(), signal.len());
//! ```

pub mod biquad;
pub mod butterworth;
pub mod detrend;
pub mod error;
pub mod source;
pub mod time;
pub mod trace;

pub use biquad::{Biquad, Coefficients, highpass_coefficients, lowpass_coefficients};
pub use butterworth::{BandpassFilter, section_qs};
pub use detrend::{demean, detrend_linear, fit_line, mean};
pub use error::{DspError, check_finite};
pub use source::{Acquisition, WaveformRequest, WaveformSource};
pub use time::{DAY_SECONDS, DateRange, Days, add_seconds, seconds_between};
pub use trace::{ConditionedTrace, Segment, StreamId, WaveformChunk, wildcard_match};
