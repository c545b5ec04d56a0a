//! Pipeline configuration validation.
//!
//! Every section is checked and all problems are reported together.
//!
//! # Example
//!
//! ```rust
//! use seisgram_config::{PipelineConfig, validate_config};
//!
//! let mut config = PipelineConfig::default();
//! assert!(validate_config(&config).is_ok());
//!
//! config.preprocess.freq_min = 5.0;
//! assert!(validate_config(&config).is_err());
//! ```

use crate::pipeline_config::{PipelineConfig, SourceKind};
use thiserror::Error;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A field holds an unusable value.
    #[error("invalid [{section}]: {reason}")]
    Invalid {
        /// Config section.
        section: String,
        /// What is wrong.
        reason: String,
    },

    /// Unknown window family.
    #[error("unknown window '{0}' (expected tukey, hann, hamming, blackman, or rectangular)")]
    UnknownWindow(String),

    /// Segments too short for even one transform frame.
    #[error("segment of {segment_len} samples is shorter than the {window_size}-sample window")]
    SegmentTooShort {
        /// Samples per segment at the canonical rate.
        segment_len: usize,
        /// Transform frame length.
        window_size: usize,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Create an invalid-field error.
    pub fn invalid(section: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::Invalid {
            section: section.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

/// Validate a pipeline configuration.
///
/// An empty date range is valid: the run simply produces an empty corpus.
pub fn validate_config(config: &PipelineConfig) -> ValidationResult<()> {
    let mut errors = Vec::new();

    let stream = &config.stream;
    for (name, code) in [
        ("network", &stream.network),
        ("station", &stream.station),
        ("channel", &stream.channel),
    ] {
        if code.trim().is_empty() {
            errors.push(ValidationError::invalid("stream", format!("{name} code is empty")));
        }
    }

    let source = &config.source;
    if source.kind == SourceKind::Fdsn && source.provider.trim().is_empty() {
        errors.push(ValidationError::invalid("source", "provider is empty"));
    }
    if source.kind == SourceKind::Archive && source.archive_dir.as_os_str().is_empty() {
        errors.push(ValidationError::invalid("source", "archive_dir is empty"));
    }
    if source.timeout_secs == 0 {
        errors.push(ValidationError::invalid("source", "timeout_secs must be positive"));
    }
    if !(source.buffer_secs.is_finite() && source.buffer_secs >= 0.0) {
        errors.push(ValidationError::invalid(
            "source",
            format!("buffer_secs {} must be finite and >= 0", source.buffer_secs),
        ));
    }

    let pre = &config.preprocess;
    if !(pre.freq_min.is_finite() && pre.freq_min > 0.0) {
        errors.push(ValidationError::invalid(
            "preprocess",
            format!("freq_min {} must be positive", pre.freq_min),
        ));
    }
    if !(pre.freq_max.is_finite() && pre.freq_max > pre.freq_min) {
        errors.push(ValidationError::invalid(
            "preprocess",
            format!("freq_max {} must exceed freq_min {}", pre.freq_max, pre.freq_min),
        ));
    }
    if pre.corners == 0 || pre.corners % 2 != 0 {
        errors.push(ValidationError::invalid(
            "preprocess",
            format!("corners {} must be a positive even number", pre.corners),
        ));
    }
    if !(pre.target_rate.is_finite() && pre.target_rate > 0.0) {
        errors.push(ValidationError::invalid(
            "preprocess",
            format!("target_rate {} must be positive", pre.target_rate),
        ));
    }

    if !(config.segment.duration_secs.is_finite() && config.segment.duration_secs > 0.0) {
        errors.push(ValidationError::invalid(
            "segment",
            format!("duration_secs {} must be positive", config.segment.duration_secs),
        ));
    }

    match config.analyzer() {
        Ok(analyzer) => {
            let segment_len = config.segment_len();
            if errors.is_empty() && segment_len < analyzer.fft_size() {
                errors.push(ValidationError::SegmentTooShort {
                    segment_len,
                    window_size: analyzer.fft_size(),
                });
            }
        }
        Err(e) => errors.push(e),
    }

    if config.output.file_name.trim().is_empty() {
        errors.push(ValidationError::invalid("output", "file_name is empty"));
    }

    collect(errors)
}
