//! Shared CLI helpers used across multiple commands.

use chrono::{DateTime, NaiveDate, Utc};
use clap::Args;
use seisgram_config::{PipelineConfig, find_config};
use std::path::PathBuf;

/// Config file selection plus stream and range overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Config file (default: ./seisgram.toml, then the user config)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// First day (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    pub start: Option<DateTime<Utc>>,

    /// Exclusive end day (YYYY-MM-DD or RFC 3339)
    #[arg(long, value_parser = parse_instant)]
    pub end: Option<DateTime<Utc>>,

    /// Network code
    #[arg(long)]
    pub network: Option<String>,

    /// Station code
    #[arg(long)]
    pub station: Option<String>,

    /// Location code (`*` for any)
    #[arg(long)]
    pub location: Option<String>,

    /// Channel code
    #[arg(long)]
    pub channel: Option<String>,
}

impl ConfigOverrides {
    /// Resolve the config file, load it (or defaults), then apply overrides.
    pub fn load(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match find_config(self.config.as_deref()) {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading config");
                PipelineConfig::load(&path)?
            }
            None => {
                tracing::info!("no config file found, using defaults");
                PipelineConfig::default()
            }
        };

        if let Some(start) = self.start {
            config.range.start = start;
        }
        if let Some(end) = self.end {
            config.range.end = end;
        }
        for (value, slot) in [
            (&self.network, &mut config.stream.network),
            (&self.station, &mut config.stream.station),
            (&self.location, &mut config.stream.location),
            (&self.channel, &mut config.stream.channel),
        ] {
            if let Some(value) = value {
                slot.clone_from(value);
            }
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parse a day (`2021-03-12`, midnight UTC) or a full RFC 3339 instant.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("Invalid date: '{}' (expected YYYY-MM-DD or RFC 3339)", s))
}
