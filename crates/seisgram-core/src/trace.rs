//! Waveform data model: stream identities, raw chunks, conditioned traces,
//! and fixed-length segments.

use crate::time::{add_seconds, seconds_between};
use chrono::{DateTime, Utc};
use std::fmt;

/// SEED stream identity `NET.STA.LOC.CHA`.
///
/// Codes may carry `*` / `?` wildcards when used in a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId {
    /// Network code, e.g. `9F`.
    pub network: String,
    /// Station code, e.g. `NUPH`.
    pub station: String,
    /// Location code; often empty or `*`.
    pub location: String,
    /// Channel code, e.g. `HHE`.
    pub channel: String,
}

impl StreamId {
    /// Build a stream id from its four codes.
    pub fn new(
        network: impl Into<String>,
        station: impl Into<String>,
        location: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            network: network.into(),
            station: station.into(),
            location: location.into(),
            channel: channel.into(),
        }
    }

    /// True if any code contains a wildcard character.
    pub fn has_wildcards(&self) -> bool {
        [&self.network, &self.station, &self.location, &self.channel]
            .iter()
            .any(|code| code.contains(['*', '?']))
    }

    /// Whether a concrete stream id satisfies this (possibly wildcard) pattern.
    pub fn matches(&self, concrete: &StreamId) -> bool {
        wildcard_match(&self.network, &concrete.network)
            && wildcard_match(&self.station, &concrete.station)
            && wildcard_match(&self.location, &concrete.location)
            && wildcard_match(&self.channel, &concrete.channel)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.network, self.station, self.location, self.channel
        )
    }
}

/// Glob match supporting `*` (any run) and `?` (any single character).
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

/// One day of raw digitized signal plus acquisition metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformChunk {
    /// Concrete stream the samples belong to.
    pub stream: StreamId,
    /// Native sample rate in Hz.
    pub sample_rate: f64,
    /// Instant of the first sample.
    pub start: DateTime<Utc>,
    /// Raw samples (counts).
    pub samples: Vec<f64>,
}

impl WaveformChunk {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if the chunk carries no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Covered duration `n / rate` in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.samples.len() as f64 / self.sample_rate
        } else {
            0.0
        }
    }

    /// Instant of the last sample.
    pub fn end(&self) -> DateTime<Utc> {
        last_sample_instant(self.start, self.sample_rate, self.samples.len())
    }
}

/// A chunk after detrend, demean, bandpass, and resampling.
///
/// Its sample rate is the pipeline's canonical rate.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionedTrace {
    stream: StreamId,
    sample_rate: f64,
    start: DateTime<Utc>,
    samples: Vec<f64>,
}

impl ConditionedTrace {
    /// Wrap conditioned samples.
    pub fn new(stream: StreamId, sample_rate: f64, start: DateTime<Utc>, samples: Vec<f64>) -> Self {
        Self {
            stream,
            sample_rate,
            start,
            samples,
        }
    }

    /// Stream identity.
    pub fn stream(&self) -> &StreamId {
        &self.stream
    }

    /// Canonical sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Instant of the first sample.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Instant of the last sample.
    pub fn end(&self) -> DateTime<Utc> {
        last_sample_instant(self.start, self.sample_rate, self.samples.len())
    }

    /// Conditioned samples.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if no samples remain.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Covered duration `n / rate` in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }

    /// First sample index at or after `instant`, clamped to `[0, len]`.
    fn index_at_or_after(&self, instant: DateTime<Utc>) -> usize {
        let offset = seconds_between(self.start, instant) * self.sample_rate;
        // Tolerate microsecond rounding in instants.
        let idx = (offset - 1e-3).ceil();
        idx.clamp(0.0, self.samples.len() as f64) as usize
    }

    /// Keep only samples whose time lies in `[from, to)`.
    pub fn trim(self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        let first = self.index_at_or_after(from);
        let last = self.index_at_or_after(to).max(first);
        let start = add_seconds(self.start, first as f64 / self.sample_rate);
        let samples = self.samples[first..last].to_vec();
        Self {
            stream: self.stream,
            sample_rate: self.sample_rate,
            start,
            samples,
        }
    }
}

/// Fixed-duration, non-overlapping window cut from a conditioned trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Position of the segment within its trace.
    pub index: usize,
    /// Instant of the first sample.
    pub start: DateTime<Utc>,
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Exactly `round(L * rate)` samples.
    pub samples: Vec<f64>,
}

impl Segment {
    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }
}

fn last_sample_instant(start: DateTime<Utc>, sample_rate: f64, len: usize) -> DateTime<Utc> {
    if len == 0 || sample_rate <= 0.0 {
        return start;
    }
    add_seconds(start, (len - 1) as f64 / sample_rate)
}
