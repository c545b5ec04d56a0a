//! Fixed-duration, non-overlapping segmentation.
//!
//! Segments are cut back to back from the trace start. A trailing remainder
//! shorter than one segment is dropped, never padded.

use seisgram_core::{ConditionedTrace, Segment, add_seconds};

/// Default segment duration: one hour.
pub const DEFAULT_SEGMENT_SECS: f64 = 3600.0;

/// Cuts conditioned traces into equal segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segmenter {
    duration_secs: f64,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(DEFAULT_SEGMENT_SECS)
    }
}

impl Segmenter {
    /// Segmenter for windows of `duration_secs` seconds.
    pub fn new(duration_secs: f64) -> Self {
        Self { duration_secs }
    }

    /// Window duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Segment length in samples at `sample_rate`.
    pub fn segment_len(&self, sample_rate: f64) -> usize {
        (self.duration_secs * sample_rate).round().max(0.0) as usize
    }

    /// Number of whole segments a trace of `len` samples yields.
    pub fn count(&self, len: usize, sample_rate: f64) -> usize {
        match self.segment_len(sample_rate) {
            0 => 0,
            seg_len => len / seg_len,
        }
    }

    /// Cut the trace into ordered segments.
    pub fn split(&self, trace: &ConditionedTrace) -> Vec<Segment> {
        let seg_len = self.segment_len(trace.sample_rate());
        if seg_len == 0 {
            return Vec::new();
        }

        trace
            .samples()
            .chunks_exact(seg_len)
            .enumerate()
            .map(|(index, chunk)| Segment {
                index,
                start: add_seconds(trace.start(), index as f64 * self.duration_secs),
                sample_rate: trace.sample_rate(),
                samples: chunk.to_vec(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use seisgram_core::StreamId;

    fn trace(len: usize, rate: f64) -> ConditionedTrace {
        ConditionedTrace::new(
            StreamId::new("9F", "NUPH", "", "HHE"),
            rate,
            Utc.with_ymd_and_hms(2021, 3, 12, 0, 0, 0).unwrap(),
            (0..len).map(|i| i as f64).collect(),
        )
    }

    #[test]
    fn full_day_gives_24_hours() {
        let segments = Segmenter::default().split(&trace(691_200, 8.0));
        assert_eq!(segments.len(), 24);
        assert!(segments.iter().all(|s| s.samples.len() == 28_800));
        assert_eq!(segments[1].samples[0], 28_800.0);
        assert_eq!(
            segments[23].start,
            Utc.with_ymd_and_hms(2021, 3, 12, 23, 0, 0).unwrap()
        );
    }

    #[test]
    fn remainder_is_dropped() {
        let segments = Segmenter::default().split(&trace(28_800 * 3 + 28_799, 8.0));
        assert_eq!(segments.len(), 3);
        assert_eq!(segments.last().unwrap().samples.len(), 28_800);
    }

    #[test]
    fn short_trace_yields_nothing() {
        assert!(Segmenter::default().split(&trace(28_799, 8.0)).is_empty());
        assert!(Segmenter::default().split(&trace(0, 8.0)).is_empty());
    }

    #[test]
    fn segments_are_contiguous() {
        let segments = Segmenter::new(10.0).split(&trace(1000, 8.0));
        assert_eq!(segments.len(), 12);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].index + 1, pair[1].index);
            assert_eq!(pair[0].samples.last().unwrap() + 1.0, pair[1].samples[0]);
        }
    }

    #[test]
    fn count_matches_split() {
        let segmenter = Segmenter::new(10.0);
        assert_eq!(segmenter.count(1000, 8.0), 12);
        assert_eq!(Segmenter::new(0.0).count(1000, 8.0), 0);
    }
}
