//! Corpus file inspection.

use clap::Args;
use ndarray::Axis;
use seisgram_analysis::mean_std;
use seisgram_io::read_corpus;

/// Display corpus shape and per-instance statistics.
#[derive(Args)]
pub struct InfoArgs {
    /// Path to the `.npy` corpus
    pub file: std::path::PathBuf,

    /// Print statistics for the first N instances
    #[arg(short = 'n', long, default_value = "0")]
    pub instances: usize,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let corpus = read_corpus(&args.file)?;
    let (n, bins, frames) = corpus.dim();

    println!("File:        {}", args.file.display());
    println!("Shape:       [{n}, {bins}, {frames}]");
    println!("Instances:   {n}");
    println!("Features:    {bins} frequency x {frames} time bins");

    let file_size = std::fs::metadata(&args.file)?.len();
    println!("File Size:   {}", format_bytes(file_size));

    if n == 0 {
        return Ok(());
    }

    let stats: Vec<(f64, f64)> = corpus
        .axis_iter(Axis(0))
        .map(|instance| mean_std(&instance.to_owned()))
        .collect();
    let non_finite = corpus.iter().filter(|v| !v.is_finite()).count();

    let worst_mean = stats.iter().map(|(m, _)| m.abs()).fold(0.0, f64::max);
    let worst_std = stats.iter().map(|(_, s)| (s - 1.0).abs()).fold(0.0, f64::max);
    let min = corpus.iter().copied().fold(f64::INFINITY, f64::min);
    let max = corpus.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    println!("\nValues:");
    println!("  Range:             [{min:.3}, {max:.3}]");
    println!("  Non-finite:        {non_finite}");
    println!("  Max |mean|:        {worst_mean:.3e}");
    println!("  Max |std - 1|:     {worst_std:.3e}");

    if args.instances > 0 {
        println!("\nInstances:");
        for (i, (mean, std)) in stats.iter().take(args.instances).enumerate() {
            println!("  {i:5}  mean {mean:+.3e}  std {std:.6}");
        }
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
