//! Configuration file commands.

use clap::{Args, Subcommand};
use seisgram_config::{
    LOCAL_CONFIG_FILE, PipelineConfig, ensure_user_config_dir, find_config, user_config_path,
};
use std::path::PathBuf;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write a config file with every default spelled out
    Init {
        /// Target file (default: ./seisgram.toml)
        path: Option<PathBuf>,

        /// Write to the user config directory instead
        #[arg(long, conflicts_with = "path")]
        user: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show {
        /// Config file (default: lookup order)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Show config file locations
    Paths,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Init { path, user, force } => init(path, user, force),
        ConfigCommand::Show { config } => show(config),
        ConfigCommand::Paths => show_paths(),
    }
}

fn init(path: Option<PathBuf>, user: bool, force: bool) -> anyhow::Result<()> {
    let path = if user {
        ensure_user_config_dir()?;
        user_config_path()
    } else {
        path.unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILE))
    };

    if path.exists() && !force {
        anyhow::bail!(
            "Config '{}' already exists. Use --force to overwrite.",
            path.display()
        );
    }

    PipelineConfig::default().save(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn show(explicit: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, origin) = match find_config(explicit.as_deref()) {
        Some(path) => (PipelineConfig::load(&path)?, path.display().to_string()),
        None => (PipelineConfig::default(), "built-in defaults".to_string()),
    };

    println!("# Source: {origin}");
    if let Err(e) = config.validate() {
        println!("# Invalid: {e}");
    }
    print!("{}", config.to_toml()?);
    Ok(())
}

fn show_paths() -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let local = cwd.join(LOCAL_CONFIG_FILE);
    let user = user_config_path();

    println!("Config lookup order:");
    println!("  1. --config FILE");
    println!("  2. {}{}", local.display(), marker(local.is_file()));
    println!("  3. {}{}", user.display(), marker(user.is_file()));
    Ok(())
}

fn marker(exists: bool) -> &'static str {
    if exists { " (found)" } else { "" }
}
