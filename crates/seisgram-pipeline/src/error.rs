//! Error types for corpus runs.

use seisgram_config::ValidationError;
use thiserror::Error;

/// Fatal run errors. Unavailable or malformed days are not errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The configuration cannot drive a run.
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),

    /// Writing shards, the ledger, or the final corpus failed.
    #[error("failed to persist corpus: {0}")]
    Persist(#[from] seisgram_io::Error),
}
