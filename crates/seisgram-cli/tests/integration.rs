//! Integration tests for seisgram-cli.
//!
//! Tests cover the CLI binary invocation, config file handling, corpus
//! inspection, and end-to-end runs against a local archive.

use std::f64::consts::PI;
use std::path::Path;
use std::process::{Command, Output};

use chrono::{TimeZone, Utc};
use ndarray::Array3;
use seisgram_core::{StreamId, WaveformChunk};
use seisgram_io::{ArchiveSource, encode_chunk, read_corpus, write_corpus};
use tempfile::TempDir;

/// Helper to get the path to the `seisgram` binary built by cargo.
fn seisgram_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_seisgram"));
    cmd.env("RUST_LOG", "warn");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Write a default config into `dir` and return its path.
fn init_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("seisgram.toml");
    let output = seisgram_bin()
        .args(["config", "init"])
        .arg(&path)
        .output()
        .expect("failed to run seisgram config init");
    assert!(output.status.success(), "config init failed");
    path
}

/// One archived day holding `hours` of 20 Hz signal.
fn archive_day(archive: &ArchiveSource, day: u32, hours: usize) {
    let start = Utc.with_ymd_and_hms(2021, 3, day, 0, 0, 0).unwrap();
    let samples = (0..hours * 3600 * 20)
        .map(|i| {
            let t = i as f64 / 20.0;
            500.0 + 80.0 * (2.0 * PI * 2.0 * t).sin() + 20.0 * (2.0 * PI * 3.3 * t).sin()
        })
        .collect();
    let chunk = WaveformChunk {
        stream: StreamId::new("9F", "NUPH", "", "HHE"),
        sample_rate: 20.0,
        start,
        samples,
    };
    let requested = StreamId::new("9F", "NUPH", "*", "HHE");
    archive
        .write_day(&requested, start, &encode_chunk(&chunk))
        .unwrap();
}

fn run_archive(config: &Path, archive: &Path, output: &Path, extra: &[&str]) -> Output {
    seisgram_bin()
        .arg("run")
        .arg("--config")
        .arg(config)
        .arg("--archive")
        .arg(archive)
        .arg("--output")
        .arg(output)
        .args(["--start", "2021-03-12", "--end", "2021-03-14", "--quiet"])
        .args(extra)
        .output()
        .expect("failed to run seisgram run")
}

// ---------------------------------------------------------------------------
// CLI binary tests -- `seisgram --help`
// ---------------------------------------------------------------------------

#[test]
fn cli_help_works() {
    let output = seisgram_bin()
        .arg("--help")
        .output()
        .expect("failed to run seisgram --help");

    assert!(output.status.success());

    let stdout = stdout(&output);
    assert!(stdout.contains("Seismic spectrogram corpus builder"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("download"));
    assert!(stdout.contains("info"));
    assert!(stdout.contains("config"));
}

#[test]
fn cli_version_works() {
    let output = seisgram_bin()
        .arg("--version")
        .output()
        .expect("failed to run seisgram --version");

    assert!(output.status.success());
    assert!(
        stdout(&output).contains("seisgram"),
        "version output should contain 'seisgram'"
    );
}

#[test]
fn cli_run_help_lists_overrides() {
    let output = seisgram_bin()
        .args(["run", "--help"])
        .output()
        .expect("failed to run seisgram run --help");

    assert!(output.status.success());
    let stdout = stdout(&output);
    for flag in ["--start", "--end", "--station", "--channel", "--archive", "--no-checkpoint", "--fresh"] {
        assert!(stdout.contains(flag), "run --help should mention {flag}");
    }
}

// ---------------------------------------------------------------------------
// CLI binary tests -- `seisgram config`
// ---------------------------------------------------------------------------

#[test]
fn cli_config_init_writes_loadable_defaults() {
    let dir = TempDir::new().unwrap();
    let path = init_config(dir.path());

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("[transform]"));
    assert!(contents.contains("window_size = 256"));

    // A second init without --force refuses to overwrite.
    let output = seisgram_bin()
        .args(["config", "init"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--force"));
}

#[test]
fn cli_config_show_reports_source() {
    let dir = TempDir::new().unwrap();
    let path = init_config(dir.path());

    let output = seisgram_bin()
        .args(["config", "show", "--config"])
        .arg(&path)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("# Source:"));
    assert!(stdout.contains("station = \"NUPH\""));
}

#[test]
fn cli_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    let output = seisgram_bin()
        .args(["run", "--config"])
        .arg(dir.path().join("missing.toml"))
        .output()
        .unwrap();

    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// CLI binary tests -- `seisgram info`
// ---------------------------------------------------------------------------

#[test]
fn cli_info_reports_shape() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Input.npy");
    write_corpus(&path, &Array3::from_elem((2, 3, 4), 0.5)).unwrap();

    let output = seisgram_bin()
        .arg("info")
        .arg(&path)
        .args(["-n", "2"])
        .output()
        .expect("failed to run seisgram info");

    assert!(output.status.success());
    let stdout = stdout(&output);
    assert!(stdout.contains("[2, 3, 4]"));
    assert!(stdout.contains("Non-finite:        0"));
}

#[test]
fn cli_info_missing_file_fails() {
    let output = seisgram_bin()
        .args(["info", "/nonexistent/Input.npy"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// CLI binary tests -- `seisgram run` against a local archive
// ---------------------------------------------------------------------------

#[test]
fn cli_run_empty_archive_writes_empty_corpus() {
    let dir = TempDir::new().unwrap();
    let config = init_config(dir.path());
    let archive = dir.path().join("archive");
    let out = dir.path().join("out");

    let output = run_archive(&config, &archive, &out, &[]);
    assert!(output.status.success(), "run failed: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("Skipped (unavailable): 2"));

    let corpus = read_corpus(&out.join("Input.npy")).unwrap();
    assert_eq!(corpus.dim(), (0, 129, 224));
}

#[test]
fn cli_run_archive_builds_and_resumes() {
    let dir = TempDir::new().unwrap();
    let config = init_config(dir.path());
    let archive_dir = dir.path().join("archive");
    let out = dir.path().join("out");
    archive_day(&ArchiveSource::new(&archive_dir), 12, 2);

    let output = run_archive(&config, &archive_dir, &out, &[]);
    assert!(output.status.success(), "run failed: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(read_corpus(&out.join("Input.npy")).unwrap().dim(), (2, 129, 224));
    assert!(out.join("ledger.json").exists());

    // Day 13 appears; day 12 is taken from its shard.
    archive_day(&ArchiveSource::new(&archive_dir), 13, 1);
    let output = run_archive(&config, &archive_dir, &out, &[]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Skipped (already processed): 1"));
    assert_eq!(read_corpus(&out.join("Input.npy")).unwrap().dim(), (3, 129, 224));
}

#[test]
fn cli_run_without_checkpoint_matches() {
    let dir = TempDir::new().unwrap();
    let config = init_config(dir.path());
    let archive_dir = dir.path().join("archive");
    archive_day(&ArchiveSource::new(&archive_dir), 12, 1);
    archive_day(&ArchiveSource::new(&archive_dir), 13, 1);

    let ckpt = dir.path().join("ckpt");
    let plain = dir.path().join("plain");
    assert!(run_archive(&config, &archive_dir, &ckpt, &["--fresh"]).status.success());
    assert!(run_archive(&config, &archive_dir, &plain, &["--no-checkpoint"]).status.success());

    assert!(!plain.join("ledger.json").exists());
    assert_eq!(
        read_corpus(&ckpt.join("Input.npy")).unwrap(),
        read_corpus(&plain.join("Input.npy")).unwrap()
    );
}

#[test]
fn cli_run_other_station_requires_fresh() {
    let dir = TempDir::new().unwrap();
    let config = init_config(dir.path());
    let archive_dir = dir.path().join("archive");
    let out = dir.path().join("out");
    archive_day(&ArchiveSource::new(&archive_dir), 12, 1);
    assert!(run_archive(&config, &archive_dir, &out, &[]).status.success());

    let output = run_archive(&config, &archive_dir, &out, &["--station", "HOPS"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--fresh"));
    assert_eq!(read_corpus(&out.join("Input.npy")).unwrap().dim(), (1, 129, 224));

    let output = run_archive(&config, &archive_dir, &out, &["--station", "HOPS", "--fresh"]);
    assert!(output.status.success());
    assert_eq!(read_corpus(&out.join("Input.npy")).unwrap().dim(), (0, 129, 224));
}
