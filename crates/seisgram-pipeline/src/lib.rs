//! Day-indexed corpus runs for seisgram.
//!
//! A [`Pipeline`] walks a date range one day at a time: acquire from a
//! [`seisgram_core::WaveformSource`], condition, segment, transform, normalize,
//! then hand every instance to a [`CorpusSink`]. Days without usable data are
//! skipped with a reason; only persistence failures abort a run.
//!
//! ## Sinks
//!
//! - [`InMemorySink`] holds the corpus and writes it once at the end
//! - [`CheckpointSink`] writes a shard per day plus a resume ledger, so a
//!   restarted run skips days that are already on disk
//!
//! ## Example
//!
//! ```rust,ignore
//! use seisgram_config::PipelineConfig;
//! use seisgram_io::ArchiveSource;
//! use seisgram_pipeline::{CheckpointSink, Pipeline};
//! use std::sync::atomic::AtomicBool;
//!
//! let config = PipelineConfig::default();
//! let pipeline = Pipeline::from_config(&config)?;
//! let mut sink = CheckpointSink::open(&config.output.dir, config.output_path(), pipeline.checkpoint_scope())?;
//! let summary = pipeline.run(&ArchiveSource::new("archive"), &mut sink, &AtomicBool::new(false), |_| {})?;
//! println!("{:?}", summary.corpus_shape);
//! ```

mod driver;
mod error;
mod outcome;
mod sink;

pub use driver::{DayResult, Pipeline};
pub use error::PipelineError;
pub use outcome::{DayOutcome, DayReport, RunSummary, SkipReason};
pub use sink::{CheckpointScope, CheckpointSink, CorpusArtifact, CorpusSink, InMemorySink};
