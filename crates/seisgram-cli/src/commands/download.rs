//! Raw day download into a local archive.
//!
//! Each day is fetched with the configured buffer, merged into one
//! contiguous trace, and written as a single miniSEED file. The archive's
//! date index lists the days that were written.

use super::common::ConfigOverrides;
use chrono::Duration;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use seisgram_core::{Acquisition, WaveformRequest};
use seisgram_io::{ArchiveSource, FdsnClient, acquire_from_bytes, encode_chunk};
use std::path::PathBuf;

/// Download raw day files.
#[derive(Args)]
pub struct DownloadArgs {
    #[command(flatten)]
    overrides: ConfigOverrides,

    /// Archive directory (default: `archive_dir` from the config)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Padding around each day in seconds (default: `buffer_secs` from the config)
    #[arg(long)]
    buffer_secs: Option<f64>,

    /// FDSN provider name or base URL
    #[arg(long)]
    provider: Option<String>,
}

pub fn run(args: DownloadArgs) -> anyhow::Result<()> {
    let config = args.overrides.load()?;
    let dir = args.output.unwrap_or_else(|| config.source.archive_dir.clone());
    let buffer_secs = args.buffer_secs.unwrap_or(config.source.buffer_secs);
    if !buffer_secs.is_finite() || buffer_secs < 0.0 {
        anyhow::bail!("--buffer-secs must be a non-negative number, got {buffer_secs}");
    }
    let provider = args.provider.as_deref().unwrap_or(&config.source.provider);

    let client = FdsnClient::new(provider, config.timeout())?;
    let archive = ArchiveSource::new(&dir);
    let stream = config.stream_id();
    let range = config.date_range();

    println!(
        "Downloading {} for {} day(s) from {}",
        stream,
        range.num_days(),
        client.base_url()
    );
    println!("  Buffer:  {buffer_secs} s");
    println!("  Archive: {}\n", dir.display());

    let pb = ProgressBar::new(range.num_days() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} days {msg}")?
            .progress_chars("##-"),
    );

    let mut written = Vec::new();
    for day in range {
        let date = day.date_naive();
        pb.set_message(date.to_string());
        let request = WaveformRequest::new(stream.clone(), day, day + Duration::days(1))
            .with_buffer(buffer_secs);

        let bytes = match client.fetch_raw(&request) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::warn!(day = %date, "no data");
                pb.inc(1);
                continue;
            }
            Err(e) => {
                tracing::warn!(day = %date, error = %e, "download failed");
                pb.inc(1);
                continue;
            }
        };

        match acquire_from_bytes(&bytes, &request) {
            Acquisition::Available(chunk) => {
                let path = archive.write_day(&stream, day, &encode_chunk(&chunk))?;
                tracing::info!(day = %date, samples = chunk.len(), path = %path.display(), "day archived");
                written.push(date);
            }
            Acquisition::Unavailable { reason } => {
                tracing::warn!(day = %date, reason = %reason, "day skipped");
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let index = archive.write_date_index(&written)?;
    println!(
        "Downloaded {} of {} day(s); date list in {}",
        written.len(),
        range.num_days(),
        index.display()
    );
    Ok(())
}
