//! Corpus sinks: where normalized spectrograms go.
//!
//! The driver owns exactly one sink per run and calls, for every visited day,
//! `begin_day`, `push` once per instance, then `end_day`. `finish` writes the
//! final `[N, F, T]` array once.

use crate::outcome::DayOutcome;
use chrono::NaiveDate;
use ndarray::{Array2, Axis};
use seisgram_analysis::NormalizedSpectrogram;
use seisgram_io::{ShardStore, stack_instances, write_corpus};
use std::path::{Path, PathBuf};

/// Written corpus artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusArtifact {
    /// File written.
    pub path: PathBuf,
    /// `[N, F, T]`.
    pub shape: (usize, usize, usize),
}

/// Destination for corpus instances.
pub trait CorpusSink {
    /// True if a previous run already persisted `day`.
    fn is_processed(&self, _day: NaiveDate) -> bool {
        false
    }

    /// A day's instances are about to be pushed.
    fn begin_day(&mut self, day: NaiveDate) -> seisgram_io::Result<()>;

    /// Add one instance of the current day.
    fn push(&mut self, instance: NormalizedSpectrogram) -> seisgram_io::Result<()>;

    /// The current day is complete.
    fn end_day(&mut self, day: NaiveDate, outcome: &DayOutcome) -> seisgram_io::Result<()>;

    /// Write the final corpus.
    fn finish(&mut self) -> seisgram_io::Result<CorpusArtifact>;
}

fn check_shape(instance: &Array2<f64>, expected: (usize, usize)) -> seisgram_io::Result<()> {
    if instance.dim() != expected {
        return Err(seisgram_io::Error::ShapeMismatch {
            expected,
            found: instance.dim(),
        });
    }
    Ok(())
}

/// Keeps the whole corpus in memory and writes it once at the end.
#[derive(Debug)]
pub struct InMemorySink {
    path: PathBuf,
    feature_shape: (usize, usize),
    instances: Vec<Array2<f64>>,
}

impl InMemorySink {
    /// Sink writing to `path` with instances of `feature_shape`.
    pub fn new(path: impl Into<PathBuf>, feature_shape: (usize, usize)) -> Self {
        Self {
            path: path.into(),
            feature_shape,
            instances: Vec::new(),
        }
    }

    /// Instances held so far.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// True if nothing was pushed.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl CorpusSink for InMemorySink {
    fn begin_day(&mut self, _day: NaiveDate) -> seisgram_io::Result<()> {
        Ok(())
    }

    fn push(&mut self, instance: NormalizedSpectrogram) -> seisgram_io::Result<()> {
        check_shape(&instance.data, self.feature_shape)?;
        self.instances.push(instance.data);
        Ok(())
    }

    fn end_day(&mut self, _day: NaiveDate, _outcome: &DayOutcome) -> seisgram_io::Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> seisgram_io::Result<CorpusArtifact> {
        let corpus = stack_instances(&self.instances, self.feature_shape)?;
        write_corpus(&self.path, &corpus)?;
        Ok(CorpusArtifact {
            path: self.path.clone(),
            shape: corpus.dim(),
        })
    }
}

/// The run a checkpoint belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointScope {
    /// `(F, T)` of every instance.
    pub feature_shape: (usize, usize),
    /// Stream and processing settings; a ledger recorded under another is rejected.
    pub fingerprint: String,
    /// Days of this run, in order. Only these are assembled.
    pub days: Vec<NaiveDate>,
}

/// Flushes every day to a shard and records it in a resume ledger.
#[derive(Debug)]
pub struct CheckpointSink {
    store: ShardStore,
    output: PathBuf,
    scope: CheckpointScope,
    pending: Vec<Array2<f64>>,
}

impl CheckpointSink {
    /// Open the checkpoint in `dir`, resuming from an existing ledger.
    pub fn open(
        dir: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        scope: CheckpointScope,
    ) -> seisgram_io::Result<Self> {
        let store = ShardStore::open(dir, scope.feature_shape, &scope.fingerprint)?;
        Ok(Self::with_store(store, output.into(), scope))
    }

    /// Open the checkpoint in `dir`, discarding previous shards and ledger.
    pub fn open_fresh(
        dir: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        scope: CheckpointScope,
    ) -> seisgram_io::Result<Self> {
        let store = ShardStore::open_fresh(dir, scope.feature_shape, &scope.fingerprint)?;
        Ok(Self::with_store(store, output.into(), scope))
    }

    fn with_store(store: ShardStore, output: PathBuf, scope: CheckpointScope) -> Self {
        Self {
            store,
            output,
            scope,
            pending: Vec::new(),
        }
    }

    /// Checkpoint directory.
    pub fn dir(&self) -> &Path {
        self.store.dir()
    }

    /// Underlying shard store.
    pub fn store(&self) -> &ShardStore {
        &self.store
    }
}

impl CorpusSink for CheckpointSink {
    fn is_processed(&self, day: NaiveDate) -> bool {
        self.store.is_processed(day)
    }

    fn begin_day(&mut self, _day: NaiveDate) -> seisgram_io::Result<()> {
        self.pending.clear();
        Ok(())
    }

    fn push(&mut self, instance: NormalizedSpectrogram) -> seisgram_io::Result<()> {
        check_shape(&instance.data, self.scope.feature_shape)?;
        self.pending.push(instance.data);
        Ok(())
    }

    fn end_day(&mut self, day: NaiveDate, outcome: &DayOutcome) -> seisgram_io::Result<()> {
        let pending = std::mem::take(&mut self.pending);
        match outcome {
            DayOutcome::Processed { degenerate, .. } => {
                let shard = stack_instances(&pending, self.scope.feature_shape)?;
                let path = self.store.write_shard(day, &shard, *degenerate)?;
                tracing::debug!(%day, path = %path.display(), instances = shard.len_of(Axis(0)), "shard written");
            }
            DayOutcome::Skipped { reason } => match reason {
                crate::SkipReason::AlreadyProcessed => {}
                other => self.store.record_skip(day, &other.to_string())?,
            },
        }
        Ok(())
    }

    fn finish(&mut self) -> seisgram_io::Result<CorpusArtifact> {
        let days = self.scope.days.iter().copied();
        let shape = self.store.write_assembled(days, &self.output)?;
        Ok(CorpusArtifact {
            path: self.output.clone(),
            shape,
        })
    }
}
