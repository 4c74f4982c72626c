//! Pipeline configuration
//!
//! A small JSON file; every field is optional:
//!
//! ```json
//! {
//!   "inputFormat": "csv",
//!   "sink": "stdout",
//!   "density": { "bucketSeconds": 60, "maxBuckets": 1440 }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use aria_core::metrics::{
    RollingTimeHistogram, DEFAULT_BUCKET_SECONDS, DEFAULT_MAX_BUCKETS,
};
use chrono::Duration;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const APP_DIR_NAME: &str = "aria-airborne";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Format registry tag for position report input
    pub input_format: String,
    /// Sink registry tag for hashed events
    pub sink: String,
    pub density: DensityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DensityConfig {
    pub bucket_seconds: u32,
    pub max_buckets: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            input_format: "csv".to_string(),
            sink: "stdout".to_string(),
            density: DensityConfig::default(),
        }
    }
}

impl Default for DensityConfig {
    fn default() -> Self {
        DensityConfig {
            bucket_seconds: DEFAULT_BUCKET_SECONDS as u32,
            max_buckets: DEFAULT_MAX_BUCKETS,
        }
    }
}

impl DensityConfig {
    pub fn bucket_width(&self) -> Duration {
        Duration::seconds(i64::from(self.bucket_seconds))
    }

    /// A fresh, empty histogram with these settings
    pub fn histogram(&self) -> Result<RollingTimeHistogram, ConfigError> {
        RollingTimeHistogram::new(self.max_buckets, self.bucket_width())
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// `<user config dir>/aria-airborne/config.json`, if a home directory exists
pub fn default_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_dir().join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl PipelineConfig {
    /// Load `explicit` if given, else the default file if present, else
    /// built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => {
                log::debug!("no config file, using defaults");
                Ok(PipelineConfig::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PipelineConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        config.validate()?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_format.trim().is_empty() {
            return Err(ConfigError::Invalid("inputFormat must not be empty".into()));
        }
        if self.sink.trim().is_empty() {
            return Err(ConfigError::Invalid("sink must not be empty".into()));
        }
        if self.density.bucket_seconds < 1 {
            return Err(ConfigError::Invalid(
                "density.bucketSeconds must be at least 1".into(),
            ));
        }
        if self.density.max_buckets < 1 {
            return Err(ConfigError::Invalid(
                "density.maxBuckets must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
