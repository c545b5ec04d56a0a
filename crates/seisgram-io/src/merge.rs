//! Stitching decoded records into continuous chunks.
//!
//! Records are grouped by stream and sorted by start time. Gaps are filled by
//! linear interpolation between the samples on either side; overlapping
//! samples already covered by an earlier record are dropped.

use crate::mseed::{MseedRecord, decode_records};
use seisgram_core::{Acquisition, StreamId, WaveformChunk, WaveformRequest, seconds_between};
use std::collections::BTreeMap;

/// Relative rate difference tolerated within one stream.
const RATE_TOLERANCE: f64 = 1e-6;

/// Merge records into one chunk per stream, ordered by stream code.
pub fn merge_records(records: Vec<MseedRecord>) -> Vec<WaveformChunk> {
    let mut groups: BTreeMap<String, Vec<MseedRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.stream.to_string())
            .or_default()
            .push(record);
    }

    groups.into_values().filter_map(merge_stream).collect()
}

/// Merge the records of a single stream.
///
/// Returns `None` if no record carries samples at a positive rate.
pub fn merge_stream(mut records: Vec<MseedRecord>) -> Option<WaveformChunk> {
    records.retain(|r| !r.samples.is_empty() && r.sample_rate > 0.0);
    records.sort_by_key(|r| r.start);

    let first = records.first()?;
    let stream = first.stream.clone();
    let start = first.start;
    let rate = first.sample_rate;
    let mut samples: Vec<f64> = Vec::new();

    for record in records {
        if (record.sample_rate - rate).abs() > RATE_TOLERANCE * rate {
            tracing::warn!(
                stream = %stream,
                expected = rate,
                found = record.sample_rate,
                "dropping record with mismatched sample rate"
            );
            continue;
        }

        let offset = (seconds_between(start, record.start) * rate).round() as i64;
        let expected = samples.len() as i64;

        if offset > expected {
            let gap = (offset - expected) as usize;
            let left = samples.last().copied().unwrap_or(record.samples[0]);
            let right = record.samples[0];
            tracing::debug!(stream = %stream, gap, "interpolating gap");
            samples.extend((1..=gap).map(|k| left + (right - left) * k as f64 / (gap + 1) as f64));
            samples.extend_from_slice(&record.samples);
        } else {
            let overlap = (expected - offset) as usize;
            if overlap < record.samples.len() {
                samples.extend_from_slice(&record.samples[overlap..]);
            }
        }
    }

    Some(WaveformChunk {
        stream,
        sample_rate: rate,
        start,
        samples,
    })
}

/// Pick the chunk matching `pattern`; with several matches, the longest wins.
pub fn select_stream(chunks: Vec<WaveformChunk>, pattern: &StreamId) -> Option<WaveformChunk> {
    let matching: Vec<WaveformChunk> = chunks
        .into_iter()
        .filter(|chunk| pattern.matches(&chunk.stream))
        .collect();

    let count = matching.len();
    let chosen = matching.into_iter().max_by_key(WaveformChunk::len)?;
    if count > 1 {
        tracing::info!(
            request = %pattern,
            candidates = count,
            chosen = %chosen.stream,
            samples = chosen.len(),
            "several streams match, using the longest"
        );
    }
    Some(chosen)
}

/// Keep records that overlap the padded request window.
///
/// A record stamped far outside the window would otherwise open a gap the
/// merge fills sample by sample.
pub fn records_in_window(records: Vec<MseedRecord>, request: &WaveformRequest) -> Vec<MseedRecord> {
    let (from, to) = (request.padded_start(), request.padded_end());
    let total = records.len();
    let kept: Vec<MseedRecord> = records
        .into_iter()
        .filter(|r| r.start < to && r.end() > from)
        .collect();

    if kept.len() < total {
        tracing::warn!(
            stream = %request.stream,
            dropped = total - kept.len(),
            "dropping records outside the request window"
        );
    }
    kept
}

/// Decode a miniSEED payload into the acquisition outcome for `request`.
pub fn acquire_from_bytes(bytes: &[u8], request: &WaveformRequest) -> Acquisition {
    if bytes.is_empty() {
        return Acquisition::unavailable("empty payload");
    }

    let records = match decode_records(bytes) {
        Ok(records) => records,
        Err(e) => return Acquisition::unavailable(format!("undecodable payload: {e}")),
    };

    let records = records_in_window(records, request);
    match select_stream(merge_records(records), &request.stream) {
        Some(chunk) => Acquisition::Available(chunk),
        None => Acquisition::unavailable(format!("no samples for {}", request.stream)),
    }
}
