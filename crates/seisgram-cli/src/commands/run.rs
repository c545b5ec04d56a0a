//! Corpus build command.

use super::common::ConfigOverrides;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use seisgram_config::{PipelineConfig, SourceKind};
use seisgram_core::WaveformSource;
use seisgram_io::{ArchiveSource, FdsnClient};
use seisgram_pipeline::{
    CheckpointSink, CorpusSink, DayOutcome, DayReport, InMemorySink, Pipeline, RunSummary,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    overrides: ConfigOverrides,

    /// Output directory (corpus, shards, and ledger)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Read day files from this archive instead of the network
    #[arg(long, value_name = "DIR")]
    archive: Option<PathBuf>,

    /// Keep the corpus in memory and write it once at the end
    #[arg(long)]
    no_checkpoint: bool,

    /// Discard shards and ledger from a previous run
    #[arg(long, conflicts_with = "no_checkpoint")]
    fresh: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = args.overrides.load()?;
    if let Some(dir) = &args.output {
        config.output.dir.clone_from(dir);
    }
    if let Some(dir) = &args.archive {
        config.source.kind = SourceKind::Archive;
        config.source.archive_dir.clone_from(dir);
    }
    if args.no_checkpoint {
        config.output.checkpoint = false;
    }

    let pipeline = Pipeline::from_config(&config)?;
    let source = build_source(&config)?;
    let mut sink = build_sink(&config, &pipeline, args.fresh)?;

    let (bins, frames) = pipeline.feature_shape();
    println!(
        "Building corpus for {} over {} day(s)",
        pipeline.stream(),
        pipeline.range().num_days()
    );
    println!("  Source:   {}", source.describe());
    println!("  Features: {bins} x {frames}");
    println!("  Output:   {}", config.output_path().display());
    println!("\nPress Ctrl+C to stop after the current day...\n");

    let stop = Arc::new(AtomicBool::new(false));
    let s = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        eprintln!("\nStopping after the current day...");
        s.store(true, Ordering::SeqCst);
    })?;

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(pipeline.range().num_days() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} days {msg}")?
            .progress_chars("##-"),
    );

    let summary = pipeline.run(&source, sink.as_mut(), &stop, |report| {
        pb.set_message(progress_message(report));
        pb.inc(1);
    })?;
    pb.finish_and_clear();

    print_summary(&summary);
    Ok(())
}

fn build_source(config: &PipelineConfig) -> anyhow::Result<Box<dyn WaveformSource>> {
    Ok(match config.source.kind {
        SourceKind::Fdsn => Box::new(FdsnClient::new(&config.source.provider, config.timeout())?),
        SourceKind::Archive => Box::new(ArchiveSource::new(&config.source.archive_dir)),
    })
}

fn build_sink(
    config: &PipelineConfig,
    pipeline: &Pipeline,
    fresh: bool,
) -> anyhow::Result<Box<dyn CorpusSink>> {
    let output = config.output_path();
    if !config.output.checkpoint {
        return Ok(Box::new(InMemorySink::new(output, pipeline.feature_shape())));
    }

    let dir = config.output.dir.clone();
    let scope = pipeline.checkpoint_scope();
    let sink = if fresh {
        CheckpointSink::open_fresh(dir, output, scope)?
    } else {
        CheckpointSink::open(dir, output, scope).map_err(|e| match e {
            seisgram_io::Error::CheckpointMismatch { .. } => {
                anyhow::anyhow!("{e}\nRerun with --fresh to discard it, or pick another --output.")
            }
            other => other.into(),
        })?
    };
    Ok(Box::new(sink))
}

fn progress_message(report: &DayReport) -> String {
    match &report.outcome {
        DayOutcome::Processed { segments, .. } => format!("{}: {segments} segment(s)", report.day),
        DayOutcome::Skipped { reason } => format!("{}: {}", report.day, reason.label()),
    }
}

fn print_summary(summary: &RunSummary) {
    let (n, f, t) = summary.corpus_shape;

    println!("{}", if summary.interrupted { "Stopped early." } else { "Done!" });
    println!("  Days visited:    {}", summary.days_visited);
    println!("  Days processed:  {}", summary.days_processed);
    println!("  New segments:    {}", summary.segments);
    println!("  Degenerate:      {}", summary.degenerate);
    for label in ["unavailable", "malformed", "already processed"] {
        let count = summary.skipped_count(label);
        if count > 0 {
            println!("  Skipped ({label}): {count}");
        }
    }
    if let Some(path) = &summary.output {
        println!("  Corpus:          {} [{n}, {f}, {t}]", path.display());
    }
}
