//! Configuration for seisgram corpus runs.
//!
//! A run is described by one [`PipelineConfig`], loaded from TOML and passed
//! explicitly to each pipeline component.
//!
//! # Features
//!
//! - **Config file**: Load and save [`PipelineConfig`] as TOML, with defaults
//!   for every field
//! - **Validation**: [`validate_config`] checks all sections and reports every
//!   problem at once
//! - **Paths**: Platform-specific config locations and lookup order
//!
//! # Example
//!
//! ```rust,no_run
//! use seisgram_config::{PipelineConfig, find_config};
//!
//! let config = match find_config(None) {
//!     Some(path) => PipelineConfig::load(path).unwrap(),
//!     None => PipelineConfig::default(),
//! };
//! config.validate().unwrap();
//!
//! for day in config.date_range() {
//!     println!("{day}");
//! }
//! ```

mod error;
mod pipeline_config;

/// Platform-specific paths for configuration.
pub mod paths;

/// Configuration validation.
pub mod validation;

pub use error::ConfigError;
pub use paths::{
    LOCAL_CONFIG_FILE, USER_CONFIG_FILE, ensure_user_config_dir, find_config, find_config_in,
    user_config_dir, user_config_path,
};
pub use pipeline_config::{
    OutputSection, PipelineConfig, PreprocessSection, RangeSection, SegmentSection, SourceKind,
    SourceSection, StreamSection, TransformSection,
};
pub use validation::{ValidationError, ValidationResult, validate_config};
