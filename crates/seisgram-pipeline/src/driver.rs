//! Day-indexed driver loop.
//!
//! ```text
//! Iterating(day) ──unavailable──────────────────────────────▶ Iterating(day+1)
//!      │
//!      └─available─▶ Preprocessing ─▶ Segmenting ─▶ Transforming(i)… ─▶ Iterating(day+1)
//!
//! past end or stop requested ─▶ Persisting ─▶ Done
//! ```
//!
//! Days run strictly in order, one at a time. Nothing is retried.

use crate::error::PipelineError;
use crate::outcome::{DayOutcome, DayReport, RunSummary, SkipReason};
use crate::sink::{CheckpointScope, CorpusSink};
use chrono::{DateTime, Duration, Utc};
use seisgram_analysis::{
    NormalizedSpectrogram, Preprocessor, Segmenter, StftAnalyzer, normalize,
};
use seisgram_config::PipelineConfig;
use seisgram_core::{Acquisition, DateRange, StreamId, WaveformRequest, WaveformSource};
use std::sync::atomic::{AtomicBool, Ordering};

/// One day's instances and outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct DayResult {
    /// What happened.
    pub outcome: DayOutcome,
    /// Normalized instances in segment order (empty when skipped).
    pub instances: Vec<NormalizedSpectrogram>,
}

impl DayResult {
    fn skipped(reason: SkipReason) -> Self {
        Self {
            outcome: DayOutcome::Skipped { reason },
            instances: Vec::new(),
        }
    }
}

/// Configured stages for a corpus run.
pub struct Pipeline {
    stream: StreamId,
    range: DateRange,
    buffer_secs: f64,
    preprocessor: Preprocessor,
    segmenter: Segmenter,
    analyzer: StftAnalyzer,
    feature_shape: (usize, usize),
    fingerprint: String,
}

impl Pipeline {
    /// Build every stage from a validated configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        Ok(Self {
            stream: config.stream_id(),
            range: config.date_range(),
            buffer_secs: config.source.buffer_secs,
            preprocessor: Preprocessor::new(config.preprocess_config()),
            segmenter: config.segmenter(),
            analyzer: config.analyzer()?,
            feature_shape: config.feature_shape()?,
            fingerprint: config.run_fingerprint(),
        })
    }

    /// `(frequency bins, time bins)` of every instance.
    pub fn feature_shape(&self) -> (usize, usize) {
        self.feature_shape
    }

    /// Days the run covers.
    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Requested stream.
    pub fn stream(&self) -> &StreamId {
        &self.stream
    }

    /// Stream and processing settings this run's instances depend on.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// What a checkpoint opened for this run must match and may assemble.
    pub fn checkpoint_scope(&self) -> CheckpointScope {
        CheckpointScope {
            feature_shape: self.feature_shape,
            fingerprint: self.fingerprint.clone(),
            days: self.range.days().map(|day| day.date_naive()).collect(),
        }
    }

    /// Acquire and transform one day. Never fails: problems become skip reasons.
    pub fn process_day<S: WaveformSource + ?Sized>(&self, source: &S, day: DateTime<Utc>) -> DayResult {
        let end = day + Duration::days(1);
        let request = WaveformRequest::new(self.stream.clone(), day, end).with_buffer(self.buffer_secs);

        let chunk = match source.fetch(&request) {
            Acquisition::Available(chunk) => chunk,
            Acquisition::Unavailable { reason } => {
                return DayResult::skipped(SkipReason::Unavailable(reason));
            }
        };
        tracing::debug!(
            day = %day.date_naive(),
            stream = %chunk.stream,
            samples = chunk.len(),
            rate = chunk.sample_rate,
            "acquired"
        );

        let trace = match self.preprocessor.process(&chunk) {
            Ok(trace) => trace.trim(day, end),
            Err(e) => return DayResult::skipped(SkipReason::Malformed(e.to_string())),
        };

        let segments = self.segmenter.split(&trace);
        let mut instances = Vec::with_capacity(segments.len());
        let mut degenerate = 0;

        for segment in &segments {
            match normalize(self.analyzer.analyze(segment)) {
                Ok(instance) => instances.push(instance),
                Err(e) => {
                    degenerate += 1;
                    tracing::warn!(
                        day = %day.date_naive(),
                        segment = segment.index,
                        start = %segment.start,
                        error = %e,
                        "dropping degenerate segment"
                    );
                }
            }
        }

        DayResult {
            outcome: DayOutcome::Processed {
                segments: instances.len(),
                degenerate,
            },
            instances,
        }
    }

    /// Run every day through `sink`, then write the corpus.
    ///
    /// `stop` is checked between days; once set, the run persists what it has.
    /// `observer` sees each finished day.
    pub fn run<S, K, F>(
        &self,
        source: &S,
        sink: &mut K,
        stop: &AtomicBool,
        mut observer: F,
    ) -> Result<RunSummary, PipelineError>
    where
        S: WaveformSource + ?Sized,
        K: CorpusSink + ?Sized,
        F: FnMut(&DayReport),
    {
        let mut summary = RunSummary::default();
        tracing::info!(
            stream = %self.stream,
            source = %source.describe(),
            days = self.range.num_days(),
            "starting run"
        );

        for day in self.range.days() {
            if stop.load(Ordering::SeqCst) {
                tracing::info!(day = %day.date_naive(), "stop requested, persisting partial corpus");
                summary.interrupted = true;
                break;
            }

            let date = day.date_naive();
            let result = if sink.is_processed(date) {
                DayResult::skipped(SkipReason::AlreadyProcessed)
            } else {
                self.process_day(source, day)
            };

            sink.begin_day(date)?;
            for instance in result.instances {
                sink.push(instance)?;
            }
            sink.end_day(date, &result.outcome)?;

            match &result.outcome {
                DayOutcome::Processed {
                    segments,
                    degenerate,
                } => tracing::info!(day = %date, segments, degenerate, "day processed"),
                DayOutcome::Skipped {
                    reason: SkipReason::AlreadyProcessed,
                } => tracing::info!(day = %date, "day already processed"),
                DayOutcome::Skipped { reason } => {
                    tracing::warn!(day = %date, reason = %reason, "day skipped");
                }
            }

            let report = DayReport {
                day: date,
                outcome: result.outcome,
            };
            summary.record(&report);
            observer(&report);
        }

        let artifact = sink.finish()?;
        tracing::info!(
            path = %artifact.path.display(),
            shape = ?artifact.shape,
            "corpus written"
        );
        summary.output = Some(artifact.path);
        summary.corpus_shape = artifact.shape;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use seisgram_core::WaveformChunk;

    struct Fixed(Acquisition);

    impl WaveformSource for Fixed {
        fn fetch(&self, _request: &WaveformRequest) -> Acquisition {
            self.0.clone()
        }
    }

    fn day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 12, 0, 0, 0).unwrap()
    }

    fn chunk(samples: Vec<f64>) -> WaveformChunk {
        WaveformChunk {
            stream: StreamId::new("9F", "NUPH", "", "HHE"),
            sample_rate: 20.0,
            start: day(),
            samples,
        }
    }

    fn noise(n: usize) -> Vec<f64> {
        let mut state = 0xBEEF_u32;
        (0..n)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state as f64 / u32::MAX as f64 - 0.5
            })
            .collect()
    }

    fn pipeline() -> Pipeline {
        Pipeline::from_config(&PipelineConfig::default()).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = PipelineConfig::default();
        config.preprocess.corners = 3;
        assert!(matches!(
            Pipeline::from_config(&config),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn unavailable_day_is_skipped() {
        let result = pipeline().process_day(&Fixed(Acquisition::unavailable("no data")), day());
        assert_eq!(
            result.outcome,
            DayOutcome::Skipped {
                reason: SkipReason::Unavailable("no data".into())
            }
        );
        assert!(result.instances.is_empty());
    }

    #[test]
    fn non_finite_day_is_malformed() {
        let mut samples = noise(1000);
        samples[10] = f64::NAN;
        let result = pipeline().process_day(&Fixed(Acquisition::Available(chunk(samples))), day());
        assert!(matches!(
            result.outcome,
            DayOutcome::Skipped {
                reason: SkipReason::Malformed(_)
            }
        ));
    }

    #[test]
    fn partial_day_yields_whole_hours() {
        // 2.5 hours of data: two full segments.
        let result = pipeline().process_day(
            &Fixed(Acquisition::Available(chunk(noise(20 * 9000)))),
            day(),
        );
        assert_eq!(
            result.outcome,
            DayOutcome::Processed {
                segments: 2,
                degenerate: 0
            }
        );
        assert_eq!(result.instances[1].start, day() + Duration::hours(1));
        assert!(result.instances.iter().all(|i| i.shape() == (129, 224)));
    }

    #[test]
    fn silent_segments_are_degenerate() {
        let result = pipeline().process_day(
            &Fixed(Acquisition::Available(chunk(vec![0.0; 20 * 7200]))),
            day(),
        );
        assert_eq!(
            result.outcome,
            DayOutcome::Processed {
                segments: 0,
                degenerate: 2
            }
        );
    }

    #[test]
    fn buffer_is_trimmed() {
        let mut config = PipelineConfig::default();
        config.source.buffer_secs = 600.0;
        let pipeline = Pipeline::from_config(&config).unwrap();

        // Starts 10 minutes before midnight; the pre-day part must not form a segment.
        let mut padded = chunk(noise(20 * (600 + 3600 + 1800)));
        padded.start = day() - Duration::minutes(10);
        let result = pipeline.process_day(&Fixed(Acquisition::Available(padded)), day());

        assert_eq!(result.outcome.segments(), 1);
        assert_eq!(result.instances[0].start, day());
    }
}
