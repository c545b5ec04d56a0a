//! Waveform acquisition and corpus persistence for seisgram.
//!
//! This crate provides:
//!
//! - **miniSEED decoding**: [`decode_records`] for v2 records (integer, float,
//!   Steim1, Steim2), plus [`merge_records`] to stitch records into
//!   continuous chunks
//! - **Acquisition sources**: [`FdsnClient`] for FDSN dataselect web services
//!   and [`ArchiveSource`] for day files on disk, both implementing
//!   [`seisgram_core::WaveformSource`]
//! - **Corpus files**: [`write_corpus`] and [`read_corpus`] for `[N, F, T]`
//!   `.npy` arrays
//! - **Checkpointing**: [`ShardStore`] for per-day shards and a resume ledger
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use seisgram_core::{StreamId, WaveformRequest, WaveformSource};
//! use seisgram_io::FdsnClient;
//!
//! let client = FdsnClient::new("GEOFON", std::time::Duration::from_secs(120))?;
//! let request = WaveformRequest::new(StreamId::new("9F", "NUPH", "*", "HHE"), start, end);
//! match client.fetch(&request) {
//!     Acquisition::Available(chunk) => println!("{} samples", chunk.len()),
//!     Acquisition::Unavailable { reason } => println!("skipped: {reason}"),
//! }
//! ```

mod archive;
mod fdsn;
mod merge;
pub mod mseed;
mod npy;
mod shards;

pub use archive::{ArchiveSource, DATE_INDEX_FILE, archive_file_name};
pub use fdsn::{DEFAULT_TIMEOUT_SECS, FdsnClient, GEOFON_URL, IRIS_URL, resolve_provider};
pub use merge::{
    acquire_from_bytes, merge_records, merge_stream, records_in_window, select_stream,
};
pub use mseed::{Encoding, MseedError, MseedRecord, decode_records, encode_chunk};
pub use npy::{read_corpus, stack_instances, write_corpus};
pub use shards::{DayStatus, LEDGER_FILE, Ledger, LedgerEntry, SHARD_DIR, ShardStore};

/// Error types for acquisition and persistence.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Undecodable miniSEED payload.
    #[error("miniSEED error: {0}")]
    Mseed(#[from] MseedError),

    /// HTTP transport error (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The web service answered with an unexpected status.
    #[error("{url} returned HTTP {status}")]
    HttpStatus {
        /// Request URL.
        url: String,
        /// Status code.
        status: u16,
    },

    /// `.npy` write error.
    #[error("npy write error: {0}")]
    NpyWrite(#[from] ndarray_npy::WriteNpyError),

    /// `.npy` read error.
    #[error("npy read error: {0}")]
    NpyRead(#[from] ndarray_npy::ReadNpyError),

    /// Ledger (de)serialization error.
    #[error("ledger error: {0}")]
    Ledger(#[from] serde_json::Error),

    /// Instances or shards disagree on the feature shape.
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// `(frequency bins, time bins)` of the corpus.
        expected: (usize, usize),
        /// Offending shape.
        found: (usize, usize),
    },

    /// A shard listed in the ledger is missing on disk.
    #[error("missing shard for {day}: {path}")]
    MissingShard {
        /// Day the shard belongs to.
        day: chrono::NaiveDate,
        /// Expected location.
        path: std::path::PathBuf,
    },

    /// A shard holds a different instance count than its ledger entry.
    #[error("shard for {day} holds {found} instances, ledger records {expected}")]
    ShardLength {
        /// Day the shard belongs to.
        day: chrono::NaiveDate,
        /// Count in the ledger.
        expected: usize,
        /// Count on disk.
        found: usize,
    },

    /// The checkpoint was written by a run with other stream or processing settings.
    #[error("checkpoint in {dir} belongs to another run (recorded {found}, current {expected})")]
    CheckpointMismatch {
        /// Checkpoint directory.
        dir: std::path::PathBuf,
        /// Fingerprint of the current run.
        expected: String,
        /// Fingerprint found in the ledger.
        found: String,
    },

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for acquisition and persistence.
pub type Result<T> = std::result::Result<T, Error>;
