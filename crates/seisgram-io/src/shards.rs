//! Per-day shards and the resume ledger.
//!
//! ```text
//! {dir}/
//! ├── ledger.json          per-day outcome, rewritten atomically after every day
//! └── shards/
//!     ├── 2021-03-12.npy   [n, F, T] for that day
//!     └── ...
//! ```
//!
//! A day is marked processed only after its shard is on disk, so a crash
//! loses at most the day in flight.
//!
//! The ledger records a run fingerprint (stream plus processing settings).
//! Shards written under another fingerprint are never mixed into a corpus.

use crate::npy::{read_corpus, write_corpus};
use crate::{Error, Result};
use chrono::NaiveDate;
use ndarray::{Array3, Axis};
use ndarray_npy::write_zeroed_npy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Ledger file name inside the output directory.
pub const LEDGER_FILE: &str = "ledger.json";
/// Shard directory name inside the output directory.
pub const SHARD_DIR: &str = "shards";

const LEDGER_VERSION: u32 = 2;

/// Recorded outcome of one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    /// Shard written.
    Processed,
    /// No shard; see the entry's reason.
    Skipped,
}

/// One ledger line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Processed or skipped.
    pub status: DayStatus,
    /// Instances in the shard.
    #[serde(default)]
    pub segments: usize,
    /// Segments dropped as degenerate.
    #[serde(default)]
    pub degenerate: usize,
    /// Skip reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Per-day outcomes of a (possibly interrupted) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Format version.
    pub version: u32,
    /// `(F, T)` of every shard.
    #[serde(default)]
    pub feature_shape: Option<(usize, usize)>,
    /// Stream and processing settings the shards were produced with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Outcomes keyed by day.
    #[serde(default)]
    pub days: BTreeMap<NaiveDate, LedgerEntry>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            version: LEDGER_VERSION,
            feature_shape: None,
            fingerprint: None,
            days: BTreeMap::new(),
        }
    }
}

impl Ledger {
    /// Instances recorded for `day` (zero unless processed).
    pub fn segments_on(&self, day: NaiveDate) -> usize {
        self.days
            .get(&day)
            .filter(|entry| entry.status == DayStatus::Processed)
            .map_or(0, |entry| entry.segments)
    }
}

/// Checkpoint directory: shards plus ledger.
#[derive(Debug)]
pub struct ShardStore {
    dir: PathBuf,
    ledger: Ledger,
}

impl ShardStore {
    /// Open (or create) a store, loading an existing ledger.
    ///
    /// A ledger recorded for a different feature shape or fingerprint is
    /// rejected.
    pub fn open(
        dir: impl Into<PathBuf>,
        feature_shape: (usize, usize),
        fingerprint: &str,
    ) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(dir.join(SHARD_DIR))?;

        let ledger_path = dir.join(LEDGER_FILE);
        let mut ledger = if ledger_path.exists() {
            let ledger: Ledger = serde_json::from_str(&fs::read_to_string(&ledger_path)?)?;
            tracing::info!(
                path = %ledger_path.display(),
                days = ledger.days.len(),
                "resuming from ledger"
            );
            ledger
        } else {
            Ledger::default()
        };

        match ledger.feature_shape {
            Some(found) if found != feature_shape => {
                return Err(Error::ShapeMismatch {
                    expected: feature_shape,
                    found,
                });
            }
            _ => ledger.feature_shape = Some(feature_shape),
        }

        match ledger.fingerprint.as_deref() {
            Some(found) if found != fingerprint => {
                return Err(Error::CheckpointMismatch {
                    dir,
                    expected: fingerprint.to_string(),
                    found: found.to_string(),
                });
            }
            None if !ledger.days.is_empty() => {
                return Err(Error::CheckpointMismatch {
                    dir,
                    expected: fingerprint.to_string(),
                    found: "unrecorded".to_string(),
                });
            }
            _ => ledger.fingerprint = Some(fingerprint.to_string()),
        }

        Ok(Self { dir, ledger })
    }

    /// Delete any previous ledger and shards, then open empty.
    pub fn open_fresh(
        dir: impl Into<PathBuf>,
        feature_shape: (usize, usize),
        fingerprint: &str,
    ) -> Result<Self> {
        let dir = dir.into();
        let shard_dir = dir.join(SHARD_DIR);
        if shard_dir.exists() {
            fs::remove_dir_all(&shard_dir)?;
        }
        let ledger_path = dir.join(LEDGER_FILE);
        if ledger_path.exists() {
            fs::remove_file(&ledger_path)?;
        }
        Self::open(dir, feature_shape, fingerprint)
    }

    /// Store root.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Current ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Shard path for a day.
    pub fn shard_path(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(SHARD_DIR).join(format!("{day}.npy"))
    }

    /// True if the day already has a shard on record.
    pub fn is_processed(&self, day: NaiveDate) -> bool {
        self.ledger
            .days
            .get(&day)
            .is_some_and(|entry| entry.status == DayStatus::Processed)
    }

    /// Persist one day's instances, then record it.
    pub fn write_shard(&mut self, day: NaiveDate, shard: &Array3<f64>, degenerate: usize) -> Result<PathBuf> {
        self.check_shape(shard)?;
        let path = self.shard_path(day);
        write_corpus(&path, shard)?;

        self.ledger.days.insert(
            day,
            LedgerEntry {
                status: DayStatus::Processed,
                segments: shard.len_of(Axis(0)),
                degenerate,
                reason: None,
            },
        );
        self.save_ledger()?;
        Ok(path)
    }

    /// Record a skipped day.
    pub fn record_skip(&mut self, day: NaiveDate, reason: &str) -> Result<()> {
        self.ledger.days.insert(
            day,
            LedgerEntry {
                status: DayStatus::Skipped,
                segments: 0,
                degenerate: 0,
                reason: Some(reason.to_string()),
            },
        );
        self.save_ledger()
    }

    /// Write the processed shards among `days` to `path` as one corpus.
    ///
    /// Days are taken in the order given; unprocessed days contribute
    /// nothing. Shards are streamed one at a time into the final file, so
    /// at most one day is held in memory. Returns `[N, F, T]`.
    pub fn write_assembled(
        &self,
        days: impl IntoIterator<Item = NaiveDate>,
        path: &Path,
    ) -> Result<(usize, usize, usize)> {
        let (bins, frames) = self.feature_shape();
        let days: Vec<NaiveDate> = days.into_iter().filter(|d| self.is_processed(*d)).collect();
        let total: usize = days.iter().map(|d| self.ledger.segments_on(*d)).sum();

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut file = tempfile::NamedTempFile::new_in(parent)?;
        write_zeroed_npy::<f64, _>(file.as_file(), (total, bins, frames))?;
        let data_bytes = (total * bins * frames * std::mem::size_of::<f64>()) as i64;
        file.seek(SeekFrom::End(-data_bytes))?;

        {
            let mut writer = BufWriter::new(file.as_file_mut());
            for day in days {
                let shard_path = self.shard_path(day);
                if !shard_path.exists() {
                    return Err(Error::MissingShard {
                        day,
                        path: shard_path,
                    });
                }
                let shard = read_corpus(&shard_path)?;
                self.check_shape(&shard)?;

                let expected = self.ledger.segments_on(day);
                let found = shard.len_of(Axis(0));
                if found != expected {
                    return Err(Error::ShardLength {
                        day,
                        expected,
                        found,
                    });
                }
                for value in &shard {
                    writer.write_all(&value.to_ne_bytes())?;
                }
                tracing::debug!(%day, instances = found, "shard appended");
            }
            writer.flush()?;
        }

        file.persist(path).map_err(|e| e.error)?;
        Ok((total, bins, frames))
    }

    fn feature_shape(&self) -> (usize, usize) {
        self.ledger.feature_shape.unwrap_or((0, 0))
    }

    fn check_shape(&self, shard: &Array3<f64>) -> Result<()> {
        let expected = self.feature_shape();
        let found = (shard.len_of(Axis(1)), shard.len_of(Axis(2)));
        if found != expected {
            return Err(Error::ShapeMismatch { expected, found });
        }
        Ok(())
    }

    fn save_ledger(&self) -> Result<()> {
        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut file, &self.ledger)?;
        file.persist(self.dir.join(LEDGER_FILE)).map_err(|e| e.error)?;
        Ok(())
    }
}
