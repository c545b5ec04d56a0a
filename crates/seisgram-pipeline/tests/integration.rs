//! Integration tests for seisgram-pipeline corpus runs.
//!
//! A synthetic source serves per-day chunks so every run is deterministic
//! and needs no network or archive.

use std::cell::Cell;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use seisgram_config::PipelineConfig;
use seisgram_core::{Acquisition, StreamId, WaveformChunk, WaveformRequest, WaveformSource};
use seisgram_io::read_corpus;
use seisgram_pipeline::{
    CheckpointSink, DayOutcome, InMemorySink, Pipeline, PipelineError, RunSummary, SkipReason,
};
use seisgram_io::Error as IoError;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const RATE: f64 = 20.0;

fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, d, 0, 0, 0).unwrap()
}

fn date(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 3, d).unwrap()
}

#[derive(Clone, Copy)]
enum DayKind {
    Missing,
    NonFinite,
    Silent,
}

/// Serves `hours` of microseism-like signal per day, seeded by the date.
struct SyntheticSource {
    hours: f64,
    special: HashMap<NaiveDate, DayKind>,
    calls: Cell<usize>,
}

impl SyntheticSource {
    fn new(hours: f64) -> Self {
        Self {
            hours,
            special: HashMap::new(),
            calls: Cell::new(0),
        }
    }

    fn with(mut self, d: u32, kind: DayKind) -> Self {
        self.special.insert(date(d), kind);
        self
    }
}

impl WaveformSource for SyntheticSource {
    fn fetch(&self, request: &WaveformRequest) -> Acquisition {
        self.calls.set(self.calls.get() + 1);
        let day = request.start.date_naive();
        let n = (self.hours * 3600.0 * RATE) as usize;

        let samples = match self.special.get(&day) {
            Some(DayKind::Missing) => return Acquisition::unavailable("no data for window"),
            Some(DayKind::Silent) => vec![0.0; n],
            Some(DayKind::NonFinite) => {
                let mut samples = signal(n, day);
                samples[n / 2] = f64::NAN;
                samples
            }
            None => signal(n, day),
        };

        Acquisition::Available(WaveformChunk {
            stream: StreamId::new("9F", "NUPH", "", "HHE"),
            sample_rate: RATE,
            start: request.start,
            samples,
        })
    }

    fn describe(&self) -> String {
        "synthetic".to_string()
    }
}

fn signal(n: usize, day: NaiveDate) -> Vec<f64> {
    let mut state = day.to_string().bytes().fold(0x9E37_79B9_u32, |acc, b| {
        acc.rotate_left(5) ^ u32::from(b)
    });
    (0..n)
        .map(|i| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let t = i as f64 / RATE;
            let x = state as f64 / u32::MAX as f64 * 2.0 - 1.0;
            300.0 + 40.0 * x + 90.0 * (2.0 * PI * 2.0 * t).sin()
        })
        .collect()
}

fn config(first: u32, last_exclusive: u32) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.range.start = day(first);
    config.range.end = day(last_exclusive);
    config
}

/// Log output collected by a test subscriber.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

fn run_in_memory(config: &PipelineConfig, source: &SyntheticSource, output: &Path) -> RunSummary {
    let pipeline = Pipeline::from_config(config).unwrap();
    let mut sink = InMemorySink::new(output, pipeline.feature_shape());
    pipeline
        .run(source, &mut sink, &AtomicBool::new(false), |_| {})
        .unwrap()
}

// ===========================================================================
// 1. Corpus shape
// ===========================================================================

#[test]
fn two_full_days_give_48_instances() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("Input.npy");

    let summary = run_in_memory(&config(12, 14), &SyntheticSource::new(24.0), &output);

    assert_eq!(summary.days_processed, 2);
    assert_eq!(summary.corpus_shape, (48, 129, 224));
    assert_eq!(read_corpus(&output).unwrap().dim(), (48, 129, 224));
}

#[test]
fn every_instance_is_standardized() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("Input.npy");
    run_in_memory(&config(12, 13), &SyntheticSource::new(3.0), &output);

    let corpus = read_corpus(&output).unwrap();
    assert_eq!(corpus.dim().0, 3);
    for instance in corpus.outer_iter() {
        let n = instance.len() as f64;
        let mean = instance.sum() / n;
        let std = (instance.mapv(|v| (v - mean).powi(2)).sum() / n).sqrt();
        assert!(mean.abs() < 1e-9, "mean {mean}");
        assert!((std - 1.0).abs() < 1e-9, "std {std}");
    }
}

#[test]
fn empty_range_writes_empty_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("Input.npy");
    let source = SyntheticSource::new(1.0);

    let summary = run_in_memory(&config(14, 14), &source, &output);

    assert_eq!(summary.days_visited, 0);
    assert_eq!(source.calls.get(), 0);
    assert_eq!(read_corpus(&output).unwrap().dim(), (0, 129, 224));
}

// ===========================================================================
// 2. Skipped days
// ===========================================================================

#[test]
fn unavailable_day_is_skipped_and_run_continues() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("Input.npy");
    let source = SyntheticSource::new(2.0).with(13, DayKind::Missing);

    let summary = run_in_memory(&config(12, 15), &source, &output);

    assert_eq!(summary.days_visited, 3);
    assert_eq!(summary.days_processed, 2);
    assert_eq!(summary.corpus_shape, (4, 129, 224));
    assert_eq!(summary.skipped_count("unavailable"), 1);
    assert_eq!(
        summary.skipped,
        vec![(date(13), SkipReason::Unavailable("no data for window".into()))]
    );
}

#[test]
fn full_days_around_a_gap_give_24_instances() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("Input.npy");
    let source = SyntheticSource::new(24.0).with(13, DayKind::Missing);

    let summary = run_in_memory(&config(12, 14), &source, &output);

    assert_eq!(summary.days_visited, 2);
    assert_eq!(summary.corpus_shape, (24, 129, 224));
    assert_eq!(read_corpus(&output).unwrap().dim(), (24, 129, 224));
}

#[test]
fn skipped_day_is_logged_with_reason() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("Input.npy");
    let source = SyntheticSource::new(1.0).with(13, DayKind::Missing);
    tracing::subscriber::with_default(subscriber, || {
        run_in_memory(&config(12, 14), &source, &output);
    });

    let logs = logs.contents();
    let line = logs
        .lines()
        .find(|line| line.contains("day skipped"))
        .unwrap_or_else(|| panic!("no skip record in:\n{logs}"));
    assert!(line.contains("WARN"), "{line}");
    assert!(line.contains("day=2021-03-13"), "{line}");
    assert!(line.contains("reason=unavailable: no data for window"), "{line}");
    assert!(!logs.contains("day=2021-03-12 reason="), "{logs}");
}

#[test]
fn non_finite_day_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("Input.npy");
    let source = SyntheticSource::new(1.0).with(12, DayKind::NonFinite);

    let summary = run_in_memory(&config(12, 14), &source, &output);

    assert_eq!(summary.skipped_count("malformed"), 1);
    assert_eq!(summary.corpus_shape, (1, 129, 224));
}

#[test]
fn silent_day_contributes_only_degenerate_segments() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("Input.npy");
    let source = SyntheticSource::new(2.0).with(12, DayKind::Silent);

    let summary = run_in_memory(&config(12, 14), &source, &output);

    assert_eq!(summary.days_processed, 2);
    assert_eq!(summary.degenerate, 2);
    assert_eq!(summary.corpus_shape, (2, 129, 224));
}

// ===========================================================================
// 3. Determinism and sinks
// ===========================================================================

#[test]
fn identical_inputs_give_identical_corpora() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.npy");
    let b = dir.path().join("b.npy");

    run_in_memory(&config(12, 14), &SyntheticSource::new(2.0), &a);
    run_in_memory(&config(12, 14), &SyntheticSource::new(2.0), &b);

    assert_eq!(read_corpus(&a).unwrap(), read_corpus(&b).unwrap());
}

#[test]
fn checkpoint_sink_matches_in_memory_sink() {
    let dir = tempfile::tempdir().unwrap();
    let direct = dir.path().join("direct.npy");
    let checkpointed = dir.path().join("ckpt").join("Input.npy");
    let config = config(12, 15);
    let source = SyntheticSource::new(2.0).with(13, DayKind::Missing);

    run_in_memory(&config, &source, &direct);

    let pipeline = Pipeline::from_config(&config).unwrap();
    let mut sink = CheckpointSink::open(
        dir.path().join("ckpt"),
        &checkpointed,
        pipeline.checkpoint_scope(),
    )
    .unwrap();
    pipeline
        .run(&source, &mut sink, &AtomicBool::new(false), |_| {})
        .unwrap();

    assert_eq!(read_corpus(&direct).unwrap(), read_corpus(&checkpointed).unwrap());
}

#[test]
fn resumed_run_skips_processed_days() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("Input.npy");
    let pipeline = Pipeline::from_config(&config(12, 15)).unwrap();

    let first = SyntheticSource::new(1.0).with(14, DayKind::Missing);
    let mut sink = CheckpointSink::open(dir.path(), &output, pipeline.checkpoint_scope()).unwrap();
    let summary = pipeline
        .run(&first, &mut sink, &AtomicBool::new(false), |_| {})
        .unwrap();
    assert_eq!(summary.corpus_shape, (2, 129, 224));
    assert_eq!(first.calls.get(), 3);

    // Day 14 is now available; days 12 and 13 come from shards.
    let second = SyntheticSource::new(1.0);
    let mut sink = CheckpointSink::open(dir.path(), &output, pipeline.checkpoint_scope()).unwrap();
    let mut reports = Vec::new();
    let summary = pipeline
        .run(&second, &mut sink, &AtomicBool::new(false), |r| {
            reports.push(r.clone());
        })
        .unwrap();

    assert_eq!(second.calls.get(), 1);
    assert_eq!(summary.skipped_count("already processed"), 2);
    assert_eq!(
        reports[2].outcome,
        DayOutcome::Processed {
            segments: 1,
            degenerate: 0
        }
    );
    assert_eq!(summary.corpus_shape, (3, 129, 224));
    assert_eq!(read_corpus(&output).unwrap().dim(), (3, 129, 224));
}

#[test]
fn rerun_over_another_range_assembles_only_that_range() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("Input.npy");
    let source = SyntheticSource::new(1.0);

    let first = Pipeline::from_config(&config(12, 15)).unwrap();
    let mut sink = CheckpointSink::open(dir.path(), &output, first.checkpoint_scope()).unwrap();
    let summary = first
        .run(&source, &mut sink, &AtomicBool::new(false), |_| {})
        .unwrap();
    assert_eq!(summary.corpus_shape, (3, 129, 224));

    let second = Pipeline::from_config(&config(20, 21)).unwrap();
    let mut sink = CheckpointSink::open(dir.path(), &output, second.checkpoint_scope()).unwrap();
    let summary = second
        .run(&source, &mut sink, &AtomicBool::new(false), |_| {})
        .unwrap();

    assert_eq!(summary.corpus_shape, (1, 129, 224));
    assert_eq!(read_corpus(&output).unwrap().dim(), (1, 129, 224));
}

#[test]
fn rerun_for_another_station_needs_a_fresh_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("Input.npy");
    let source = SyntheticSource::new(1.0);

    let nuph = Pipeline::from_config(&config(12, 15)).unwrap();
    let mut sink = CheckpointSink::open(dir.path(), &output, nuph.checkpoint_scope()).unwrap();
    nuph.run(&source, &mut sink, &AtomicBool::new(false), |_| {})
        .unwrap();

    let mut hops_config = config(20, 21);
    hops_config.stream.station = "HOPS".to_string();
    let hops = Pipeline::from_config(&hops_config).unwrap();
    assert!(matches!(
        CheckpointSink::open(dir.path(), &output, hops.checkpoint_scope()),
        Err(IoError::CheckpointMismatch { .. })
    ));

    let mut sink = CheckpointSink::open_fresh(dir.path(), &output, hops.checkpoint_scope()).unwrap();
    let summary = hops
        .run(&source, &mut sink, &AtomicBool::new(false), |_| {})
        .unwrap();
    assert_eq!(summary.corpus_shape, (1, 129, 224));
    assert_eq!(read_corpus(&output).unwrap().dim(), (1, 129, 224));
}

// ===========================================================================
// 4. Stop and failure
// ===========================================================================

#[test]
fn stop_flag_persists_partial_corpus() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("Input.npy");
    let pipeline = Pipeline::from_config(&config(12, 20)).unwrap();
    let mut sink = InMemorySink::new(&output, pipeline.feature_shape());
    let source = SyntheticSource::new(1.0);

    let summary = pipeline
        .run(&source, &mut sink, &AtomicBool::new(true), |_| {})
        .unwrap();

    assert!(summary.interrupted);
    assert_eq!(source.calls.get(), 0);
    assert_eq!(read_corpus(&output).unwrap().dim(), (0, 129, 224));
}

#[test]
fn observer_can_request_stop() {
    use std::sync::atomic::Ordering;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("Input.npy");
    let pipeline = Pipeline::from_config(&config(12, 20)).unwrap();
    let mut sink = InMemorySink::new(&output, pipeline.feature_shape());
    let stop = AtomicBool::new(false);

    let summary = pipeline
        .run(&SyntheticSource::new(1.0), &mut sink, &stop, |_| {
            stop.store(true, Ordering::SeqCst);
        })
        .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.days_visited, 1);
    assert_eq!(summary.corpus_shape, (1, 129, 224));
}

#[test]
fn unwritable_output_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"file").unwrap();

    let pipeline = Pipeline::from_config(&config(12, 13)).unwrap();
    let mut sink = InMemorySink::new(blocker.join("Input.npy"), pipeline.feature_shape());
    let result = pipeline.run(
        &SyntheticSource::new(1.0),
        &mut sink,
        &AtomicBool::new(false),
        |_| {},
    );

    assert!(matches!(result, Err(PipelineError::Persist(_))));
}

#[test]
fn buffered_requests_still_cut_from_midnight() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("Input.npy");
    let mut config = config(12, 13);
    config.source.buffer_secs = 4320.0;

    struct Padded;
    impl WaveformSource for Padded {
        fn fetch(&self, request: &WaveformRequest) -> Acquisition {
            let start = request.padded_start();
            let n = ((3.0 * 3600.0 + 4320.0) * RATE) as usize;
            Acquisition::Available(WaveformChunk {
                stream: StreamId::new("9F", "NUPH", "", "HHE"),
                sample_rate: RATE,
                start,
                samples: signal(n, start.date_naive()),
            })
        }
    }

    let pipeline = Pipeline::from_config(&config).unwrap();
    assert_eq!(pipeline.range().num_days(), 1);
    let mut sink = InMemorySink::new(&output, pipeline.feature_shape());
    let summary = pipeline
        .run(&Padded, &mut sink, &AtomicBool::new(false), |_| {})
        .unwrap();

    // 72 minutes of pre-day buffer are dropped; three whole hours remain.
    assert_eq!(summary.segments, 3);
}
