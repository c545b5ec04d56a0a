//! Per-day outcomes and run summaries.

use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;

/// Why a day contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The source had no usable data.
    Unavailable(String),
    /// Data arrived but could not be conditioned.
    Malformed(String),
    /// A previous run already persisted this day.
    AlreadyProcessed,
}

impl SkipReason {
    /// Short category label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Malformed(_) => "malformed",
            Self::AlreadyProcessed => "already processed",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(detail) | Self::Malformed(detail) => {
                write!(f, "{}: {}", self.label(), detail)
            }
            Self::AlreadyProcessed => f.write_str(self.label()),
        }
    }
}

/// Result of one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayOutcome {
    /// The day was conditioned and segmented.
    Processed {
        /// Instances added to the corpus.
        segments: usize,
        /// Segments dropped as degenerate.
        degenerate: usize,
    },
    /// Nothing was added.
    Skipped {
        /// Cause.
        reason: SkipReason,
    },
}

impl DayOutcome {
    /// Instances the day contributed.
    pub fn segments(&self) -> usize {
        match self {
            Self::Processed { segments, .. } => *segments,
            Self::Skipped { .. } => 0,
        }
    }
}

/// One finished day, handed to run observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayReport {
    /// Day start (UTC date).
    pub day: NaiveDate,
    /// What happened.
    pub outcome: DayOutcome,
}

/// Totals for a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Days visited (including skipped).
    pub days_visited: usize,
    /// Days processed in this run.
    pub days_processed: usize,
    /// Instances added in this run.
    pub segments: usize,
    /// Segments dropped as degenerate.
    pub degenerate: usize,
    /// Skipped days with their reasons, in order.
    pub skipped: Vec<(NaiveDate, SkipReason)>,
    /// The stop flag ended the run early.
    pub interrupted: bool,
    /// Final corpus file.
    pub output: Option<PathBuf>,
    /// `[N, F, T]` of the final corpus.
    pub corpus_shape: (usize, usize, usize),
}

impl RunSummary {
    /// Skipped days in one category.
    pub fn skipped_count(&self, label: &str) -> usize {
        self.skipped
            .iter()
            .filter(|(_, reason)| reason.label() == label)
            .count()
    }

    pub(crate) fn record(&mut self, report: &DayReport) {
        self.days_visited += 1;
        match &report.outcome {
            DayOutcome::Processed {
                segments,
                degenerate,
            } => {
                self.days_processed += 1;
                self.segments += segments;
                self.degenerate += degenerate;
            }
            DayOutcome::Skipped { reason } => self.skipped.push((report.day, reason.clone())),
        }
    }
}
