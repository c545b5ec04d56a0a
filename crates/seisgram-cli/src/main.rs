//! Seisgram CLI - build normalized spectrogram corpora from seismic waveforms.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "seisgram")]
#[command(author, version, about = "Seismic spectrogram corpus builder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a corpus over a date range
    Run(commands::run::RunArgs),

    /// Download raw day files into a local archive
    Download(commands::download::DownloadArgs),

    /// Show shape and statistics of a corpus file
    Info(commands::info::InfoArgs),

    /// Create or show configuration files
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Download(args) => commands::download::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
