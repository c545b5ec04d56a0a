//! Integration tests for seisgram-io archive acquisition and corpus persistence.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use ndarray::Array2;
use seisgram_core::{Acquisition, StreamId, WaveformChunk, WaveformRequest, WaveformSource};
use seisgram_io::{
    ArchiveSource, ShardStore, decode_records, encode_chunk, read_corpus, stack_instances,
    write_corpus,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, 12, 0, 0, 0).unwrap()
}

fn chunk(stream: StreamId, offset_secs: i64, rate: f64, samples: Vec<f64>) -> WaveformChunk {
    WaveformChunk {
        stream,
        sample_rate: rate,
        start: day() + Duration::seconds(offset_secs),
        samples,
    }
}

fn request(stream: StreamId) -> WaveformRequest {
    WaveformRequest::new(stream, day(), day() + Duration::days(1))
}

// ---------------------------------------------------------------------------
// Archive acquisition
// ---------------------------------------------------------------------------

#[test]
fn archive_merges_gapped_records() {
    let dir = tempfile::tempdir().unwrap();
    let archive = ArchiveSource::new(dir.path());
    let stream = StreamId::new("9F", "NUPH", "", "HHE");

    // 0..10 s then 20..30 s at 10 Hz; the 10 s hole is interpolated.
    let mut bytes = encode_chunk(&chunk(stream.clone(), 0, 10.0, vec![1.0; 100]));
    bytes.extend(encode_chunk(&chunk(stream.clone(), 20, 10.0, vec![3.0; 100])));
    archive.write_day(&stream, day(), &bytes).unwrap();

    let Acquisition::Available(merged) = archive.fetch(&request(stream)) else {
        panic!("expected data");
    };
    assert_eq!(merged.len(), 300);
    assert_eq!(merged.samples[99], 1.0);
    assert!((merged.samples[150] - 2.0).abs() < 0.02);
    assert_eq!(merged.samples[200], 3.0);
}

#[test]
fn wildcard_request_picks_longest_stream() {
    let dir = tempfile::tempdir().unwrap();
    let archive = ArchiveSource::new(dir.path());
    let pattern = StreamId::new("9F", "NUPH", "*", "HHE");

    let short = StreamId::new("9F", "NUPH", "00", "HHE");
    let long = StreamId::new("9F", "NUPH", "10", "HHE");
    let mut bytes = encode_chunk(&chunk(short, 0, 20.0, vec![1.0; 40]));
    bytes.extend(encode_chunk(&chunk(long.clone(), 0, 20.0, vec![2.0; 900])));
    archive.write_day(&pattern, day(), &bytes).unwrap();

    match archive.fetch(&request(pattern)) {
        Acquisition::Available(chunk) => {
            assert_eq!(chunk.stream, long);
            assert_eq!(chunk.len(), 900);
        }
        Acquisition::Unavailable { reason } => panic!("unexpected skip: {reason}"),
    }
}

#[test]
fn corrupt_archive_file_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let archive = ArchiveSource::new(dir.path());
    let stream = StreamId::new("9F", "NUPH", "", "HHE");

    let mut bytes = encode_chunk(&chunk(stream.clone(), 0, 10.0, vec![1.0; 10]));
    bytes.truncate(1000);
    archive.write_day(&stream, day(), &bytes).unwrap();

    assert!(decode_records(&bytes).is_err());
    assert!(!archive.fetch(&request(stream)).is_available());
}

// ---------------------------------------------------------------------------
// Corpus persistence
// ---------------------------------------------------------------------------

#[test]
fn checkpointed_corpus_matches_direct_write() {
    let dir = tempfile::tempdir().unwrap();
    let instances: Vec<Array2<f64>> = (0..5)
        .map(|i| Array2::from_shape_fn((4, 6), |(f, t)| (i * 100 + f * 10 + t) as f64))
        .collect();

    let direct = stack_instances(&instances, (4, 6)).unwrap();
    write_corpus(&dir.path().join("direct.npy"), &direct).unwrap();

    let mut store = ShardStore::open(dir.path().join("ckpt"), (4, 6), "9F.NUPH..HHE").unwrap();
    let days = [
        NaiveDate::from_ymd_opt(2021, 3, 12).unwrap(),
        NaiveDate::from_ymd_opt(2021, 3, 13).unwrap(),
    ];
    store
        .write_shard(days[0], &stack_instances(&instances[..2], (4, 6)).unwrap(), 0)
        .unwrap();
    store
        .write_shard(days[1], &stack_instances(&instances[2..], (4, 6)).unwrap(), 0)
        .unwrap();

    let assembled = dir.path().join("assembled.npy");
    store.write_assembled(days, &assembled).unwrap();
    assert_eq!(
        read_corpus(&assembled).unwrap(),
        read_corpus(&dir.path().join("direct.npy")).unwrap()
    );
}
