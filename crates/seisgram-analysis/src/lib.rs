//! Seisgram Analysis - conditioning and spectral features for seismic traces
//!
//! This crate turns raw day chunks into normalized spectrograms:
//!
//! - [`preprocess`] - Detrend → demean → bandpass → resample chain
//! - [`resample`] - Polyphase rational resampling
//! - [`segment`] - Fixed-duration, non-overlapping segmentation
//! - [`fft`] - FFT wrapper with windowing functions
//! - [`spectrogram`] - STFT power spectral density with log compression
//! - [`normalize`] - Per-instance z-score normalization
//!
//! ## Example Workflow
//!
//! ```rust,ignore
//! use seisgram_analysis::{Preprocessor, PreprocessConfig, Segmenter, StftAnalyzer, normalize};
//!
//! let trace = Preprocessor::new(PreprocessConfig::default()).process(&chunk)?;
//! let analyzer = StftAnalyzer::default_for_size(256)?;
//!
//! for segment in Segmenter::default().split(&trace) {
//!     match normalize(analyzer.analyze(&segment)) {
//!         Ok(features) => corpus.push(features),
//!         Err(degenerate) => eprintln!("dropping segment: {degenerate}"),
//!     }
//! }
//! ```

pub mod fft;
pub mod normalize;
pub mod preprocess;
pub mod resample;
pub mod segment;
pub mod spectrogram;

pub use fft::{Fft, Window};
pub use normalize::{DegenerateSpectrogram, MIN_STD, NormalizedSpectrogram, mean_std, normalize};
pub use preprocess::{PreprocessConfig, PreprocessError, Preprocessor};
pub use resample::{ResampleError, rational_ratio, resample, resample_rate};
pub use segment::{DEFAULT_SEGMENT_SECS, Segmenter};
pub use spectrogram::{Spectrogram, StftAnalyzer, TransformError};
