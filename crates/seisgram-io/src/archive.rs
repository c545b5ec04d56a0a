//! Local archive of per-day miniSEED files.
//!
//! Layout: `{dir}/{NET}.{STA}.{LOC}.{CHA}.{YYYY-MM-DD}.mseed`. Wildcard
//! characters in the stream codes become `_` so a wildcard request maps to a
//! single file name.

use crate::Result;
use crate::merge::acquire_from_bytes;
use chrono::{DateTime, NaiveDate, Utc};
use seisgram_core::{Acquisition, StreamId, WaveformRequest, WaveformSource};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Plain-text list of archived days, one `YYYY-MM-DD` per line.
pub const DATE_INDEX_FILE: &str = "dates.txt";

fn file_code(code: &str) -> String {
    code.chars()
        .map(|c| if c == '*' || c == '?' { '_' } else { c })
        .collect()
}

/// File name for one stream and day.
pub fn archive_file_name(stream: &StreamId, day: DateTime<Utc>) -> String {
    format!(
        "{}.{}.{}.{}.{}.mseed",
        file_code(&stream.network),
        file_code(&stream.station),
        file_code(&stream.location),
        file_code(&stream.channel),
        day.format("%Y-%m-%d")
    )
}

/// Day files in a directory.
#[derive(Debug, Clone)]
pub struct ArchiveSource {
    dir: PathBuf,
}

impl ArchiveSource {
    /// Archive rooted at `dir`. The directory need not exist yet.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Archive root.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file for one stream and day.
    pub fn path_for(&self, stream: &StreamId, day: DateTime<Utc>) -> PathBuf {
        self.dir.join(archive_file_name(stream, day))
    }

    /// Store a day's miniSEED bytes, replacing any previous file.
    pub fn write_day(&self, stream: &StreamId, day: DateTime<Utc>, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(stream, day);
        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        file.write_all(bytes)?;
        file.persist(&path).map_err(|e| e.error)?;
        Ok(path)
    }

    /// Write the list of archived days.
    pub fn write_date_index(&self, days: &[NaiveDate]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(DATE_INDEX_FILE);
        let contents: String = days.iter().map(|d| format!("{d}\n")).collect();
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Read the list of archived days; missing index means none.
    pub fn read_date_index(&self) -> Result<Vec<NaiveDate>> {
        let path = self.dir.join(DATE_INDEX_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        Ok(fs::read_to_string(path)?
            .lines()
            .filter_map(|line| line.trim().parse().ok())
            .collect())
    }
}

impl WaveformSource for ArchiveSource {
    fn fetch(&self, request: &WaveformRequest) -> Acquisition {
        let path = self.path_for(&request.stream, request.start);
        if !path.exists() {
            return Acquisition::unavailable(format!("no archived file {}", path.display()));
        }

        match fs::read(&path) {
            Ok(bytes) => acquire_from_bytes(&bytes, request),
            Err(e) => Acquisition::unavailable(format!("cannot read {}: {e}", path.display())),
        }
    }

    fn describe(&self) -> String {
        format!("archive at {}", self.dir.display())
    }
}
