//! Pipeline configuration
//!
//! Defaults, then an optional JSON file, then environment variables; the
//! CLI applies its flags last.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::dsp::DEFAULT_TAPER_FRACTION;
use crate::error::{Result, SeismicError};
use crate::waveform::mseed::MSEED_EXTENSION;

/// Environment variable overriding the FDSN base URL
pub const ENV_FDSN_URL: &str = "SEISLOADER_FDSN_URL";
/// Environment variable overriding the FDSN request timeout (milliseconds)
pub const ENV_FDSN_TIMEOUT_MS: &str = "SEISLOADER_FDSN_TIMEOUT_MS";

/// What to do when one input file cannot be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DecodeFailurePolicy {
    /// Fail the whole run
    #[default]
    Abort,
    /// Log the file and continue with the rest
    Skip,
}

/// Station directory service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FdsnConfig {
    /// Data center base URL, without the `/fdsnws` path
    pub base_url: String,
    /// Per-request timeout
    pub timeout_ms: u64,
}

impl Default for FdsnConfig {
    fn default() -> Self {
        Self {
            base_url: "https://service.iris.edu".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub db_file: PathBuf,
    pub helicorder_file: PathBuf,
    pub map_file: PathBuf,
    /// File extensions (without the dot) treated as waveform files
    pub extensions: Vec<String>,
    pub decode_policy: DecodeFailurePolicy,
    /// Fraction of each trace tapered, split across both edges
    pub taper_fraction: f64,
    /// Stations always placed on the map alongside those in the data
    pub reference_stations: Vec<String>,
    /// Enforce one row per (network, station, location, channel, timestamp)
    pub unique_samples: bool,
    pub fdsn: FdsnConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./SEP"),
            db_file: PathBuf::from("seismic_data.db"),
            helicorder_file: PathBuf::from("helicorder.json"),
            map_file: PathBuf::from("map.json"),
            extensions: vec![MSEED_EXTENSION.to_string()],
            decode_policy: DecodeFailurePolicy::Abort,
            taper_fraction: DEFAULT_TAPER_FRACTION,
            reference_stations: vec!["HOA".to_string(), "SUG".to_string()],
            unique_samples: false,
            fdsn: FdsnConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from an optional JSON file, then apply environment
    /// overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file; missing fields take their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| SeismicError::InvalidConfig {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply `SEISLOADER_*` environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(url) = env::var(ENV_FDSN_URL) {
            self.fdsn.base_url = url;
        }
        if let Some(timeout) = env::var(ENV_FDSN_TIMEOUT_MS)
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.fdsn.timeout_ms = timeout;
        }
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.taper_fraction) {
            return Err(SeismicError::InvalidConfig {
                reason: format!(
                    "taper_fraction must be within 0..=1, got {}",
                    self.taper_fraction
                ),
            });
        }
        if self.extensions.is_empty() {
            return Err(SeismicError::InvalidConfig {
                reason: "at least one waveform file extension is required".to_string(),
            });
        }
        if self.fdsn.timeout_ms == 0 {
            return Err(SeismicError::InvalidConfig {
                reason: "fdsn.timeout_ms must be positive".to_string(),
            });
        }
        Ok(())
    }
}
