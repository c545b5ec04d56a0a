//! Pipeline configuration file format.

use chrono::{DateTime, TimeZone, Utc};
use seisgram_analysis::{PreprocessConfig, Segmenter, StftAnalyzer, Window};
use seisgram_core::{DateRange, StreamId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::validation::{ValidationError, validate_config};

/// Everything a corpus run needs, passed explicitly to each component.
///
/// # TOML Format
///
/// ```toml
/// [stream]
/// network = "9F"
/// station = "NUPH"
/// location = "*"
/// channel = "HHE"
///
/// [range]
/// start = "2021-03-12T00:00:00Z"
/// end = "2021-06-24T00:00:00Z"
///
/// [source]
/// kind = "fdsn"            # or "archive"
/// provider = "GEOFON"
/// archive_dir = "data/mseed"
/// timeout_secs = 120
/// buffer_secs = 0.0
///
/// [preprocess]
/// freq_min = 1.0
/// freq_max = 4.0
/// corners = 4
/// zero_phase = false
/// target_rate = 8.0
///
/// [segment]
/// duration_secs = 3600.0
///
/// [transform]
/// window_size = 256
/// overlap = 0.5
/// window = "tukey"
///
/// [output]
/// dir = "data"
/// file_name = "Input.npy"
/// checkpoint = true
/// ```
///
/// Every section and field is optional; missing values take the defaults above.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Station/channel identity.
    pub stream: StreamSection,
    /// Day range.
    pub range: RangeSection,
    /// Acquisition source.
    pub source: SourceSection,
    /// Conditioning chain.
    pub preprocess: PreprocessSection,
    /// Segmentation.
    pub segment: SegmentSection,
    /// Spectral transform.
    pub transform: TransformSection,
    /// Corpus output.
    pub output: OutputSection,
}

/// `[stream]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamSection {
    /// Network code.
    pub network: String,
    /// Station code.
    pub station: String,
    /// Location code; `*` matches any.
    pub location: String,
    /// Channel code.
    pub channel: String,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            network: "9F".to_string(),
            station: "NUPH".to_string(),
            location: "*".to_string(),
            channel: "HHE".to_string(),
        }
    }
}

/// `[range]`, end exclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RangeSection {
    /// First day start.
    pub start: DateTime<Utc>,
    /// Exclusive end.
    pub end: DateTime<Utc>,
}

impl Default for RangeSection {
    fn default() -> Self {
        Self {
            start: Utc.with_ymd_and_hms(2021, 3, 12, 0, 0, 0).single().unwrap_or_default(),
            end: Utc.with_ymd_and_hms(2021, 6, 24, 0, 0, 0).single().unwrap_or_default(),
        }
    }
}

/// Where waveforms come from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// FDSN dataselect web service.
    #[default]
    Fdsn,
    /// Local day-file archive.
    Archive,
}

/// `[source]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceSection {
    /// Source kind.
    pub kind: SourceKind,
    /// FDSN provider name or base URL.
    pub provider: String,
    /// Archive directory (archive source, download target).
    pub archive_dir: PathBuf,
    /// Network timeout per request.
    pub timeout_secs: u64,
    /// Symmetric padding around each day, trimmed after conditioning.
    pub buffer_secs: f64,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            kind: SourceKind::Fdsn,
            provider: "GEOFON".to_string(),
            archive_dir: PathBuf::from("data/mseed"),
            timeout_secs: 120,
            buffer_secs: 0.0,
        }
    }
}

/// `[preprocess]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreprocessSection {
    /// Lower bandpass corner (Hz).
    pub freq_min: f64,
    /// Upper bandpass corner (Hz).
    pub freq_max: f64,
    /// Butterworth order.
    pub corners: usize,
    /// Forward-backward filtering.
    pub zero_phase: bool,
    /// Canonical rate (Hz).
    pub target_rate: f64,
}

impl Default for PreprocessSection {
    fn default() -> Self {
        let defaults = PreprocessConfig::default();
        Self {
            freq_min: defaults.freq_min,
            freq_max: defaults.freq_max,
            corners: defaults.corners,
            zero_phase: defaults.zero_phase,
            target_rate: defaults.target_rate,
        }
    }
}

/// `[segment]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmentSection {
    /// Segment duration in seconds.
    pub duration_secs: f64,
}

impl Default for SegmentSection {
    fn default() -> Self {
        Self {
            duration_secs: seisgram_analysis::DEFAULT_SEGMENT_SECS,
        }
    }
}

/// `[transform]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransformSection {
    /// Frame length N.
    pub window_size: usize,
    /// Overlap fraction in `[0, 1)`.
    pub overlap: f64,
    /// Window family name.
    pub window: String,
}

impl Default for TransformSection {
    fn default() -> Self {
        Self {
            window_size: 256,
            overlap: 0.5,
            window: "tukey".to_string(),
        }
    }
}

/// `[output]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSection {
    /// Output directory.
    pub dir: PathBuf,
    /// Final corpus file name.
    pub file_name: String,
    /// Per-day shards with a resume ledger.
    pub checkpoint: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            file_name: "Input.npy".to_string(),
            checkpoint: true,
        }
    }
}

impl PipelineConfig {
    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the config to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
            }
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_config(self)
    }

    /// Requested stream.
    pub fn stream_id(&self) -> StreamId {
        StreamId::new(
            &self.stream.network,
            &self.stream.station,
            &self.stream.location,
            &self.stream.channel,
        )
    }

    /// Day range to iterate.
    pub fn date_range(&self) -> DateRange {
        DateRange::new(self.range.start, self.range.end)
    }

    /// Network timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_secs)
    }

    /// Conditioning parameters.
    pub fn preprocess_config(&self) -> PreprocessConfig {
        PreprocessConfig {
            freq_min: self.preprocess.freq_min,
            freq_max: self.preprocess.freq_max,
            corners: self.preprocess.corners,
            zero_phase: self.preprocess.zero_phase,
            target_rate: self.preprocess.target_rate,
        }
    }

    /// Segmenter for the configured duration.
    pub fn segmenter(&self) -> Segmenter {
        Segmenter::new(self.segment.duration_secs)
    }

    /// Window function named in `[transform]`.
    pub fn window(&self) -> Result<Window, ValidationError> {
        Window::from_name(&self.transform.window)
            .ok_or_else(|| ValidationError::UnknownWindow(self.transform.window.clone()))
    }

    /// Spectral analyzer for `[transform]`.
    pub fn analyzer(&self) -> Result<StftAnalyzer, ValidationError> {
        StftAnalyzer::new(self.transform.window_size, self.transform.overlap, self.window()?)
            .map_err(|e| ValidationError::invalid("transform", e.to_string()))
    }

    /// Samples per segment at the canonical rate.
    pub fn segment_len(&self) -> usize {
        self.segmenter().segment_len(self.preprocess.target_rate)
    }

    /// `(frequency bins, time bins)` of every corpus instance.
    pub fn feature_shape(&self) -> Result<(usize, usize), ValidationError> {
        Ok(self.analyzer()?.output_shape(self.segment_len()))
    }

    /// Final corpus path.
    pub fn output_path(&self) -> PathBuf {
        self.output.dir.join(&self.output.file_name)
    }

    /// Stream and processing settings that determine every instance's values.
    ///
    /// The day range, source kind and output location are left out: runs
    /// that differ only in those may share a checkpoint.
    pub fn run_fingerprint(&self) -> String {
        let p = &self.preprocess;
        let t = &self.transform;
        format!(
            "{}|buffer={}|bandpass={}-{}/{}/{}|rate={}|segment={}|stft={}/{}/{}",
            self.stream_id(),
            self.source.buffer_secs,
            p.freq_min,
            p.freq_max,
            p.corners,
            if p.zero_phase { "zerophase" } else { "causal" },
            p.target_rate,
            self.segment.duration_secs,
            t.window_size,
            t.overlap,
            t.window.to_ascii_lowercase(),
        )
    }
}
