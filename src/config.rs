//! Configuration management for the signage display.
//!
//! Handles loading, saving, and validating configuration from JSON files.

use crate::catalog::{self, Catalog, CatalogError};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/opt/signage-display/config.json";

/// Days of the week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Get display name for the weekday
    pub fn display_name(&self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    /// Convert from chrono::Weekday
    pub fn from_chrono(wd: chrono::Weekday) -> Self {
        match wd {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }

    /// Current weekday from the host's local clock
    pub fn today() -> Self {
        Self::from_chrono(chrono::Local::now().weekday())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid catalog: {0}")]
    CatalogError(#[from] CatalogError),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Image catalog to rotate through
    #[serde(default = "catalog::builtin::weekly")]
    pub catalog: Catalog,

    /// Seconds between automatic advances
    #[serde(default = "default_rotation_interval")]
    pub rotation_interval_secs: u64,

    /// Base URL for the placeholder shown when an image fails to load
    #[serde(default = "default_placeholder_base")]
    pub placeholder_base: String,

    /// Directory relative image references resolve against
    #[serde(default = "default_asset_root")]
    pub asset_root: PathBuf,

    /// Fetch every catalog image into the cache at startup
    #[serde(default = "default_true")]
    pub preload: bool,

    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,

    /// Append log output to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

fn default_rotation_interval() -> u64 {
    10
}

fn default_placeholder_base() -> String {
    "https://placehold.co/1920x1080/FF0000/ffffff".to_string()
}

fn default_asset_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: catalog::builtin::weekly(),
            rotation_interval_secs: default_rotation_interval(),
            placeholder_base: default_placeholder_base(),
            asset_root: default_asset_root(),
            preload: true,
            verbose: false,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults.
    ///
    /// A missing, unparsable or invalid file yields `Config::default()`
    /// together with the error, so the caller can report it once logging
    /// is up.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> (Self, Option<ConfigError>) {
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Save configuration to a JSON file atomically
    ///
    /// Writes to a temporary file and renames it over the target so a power
    /// cut never leaves a truncated config behind.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)?;

        std::fs::rename(&tmp_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            ConfigError::ReadError(e)
        })?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.catalog.validate()?;

        if self.rotation_interval_secs < 1 || self.rotation_interval_secs > 3600 {
            return Err(ConfigError::ValidationError(format!(
                "rotation_interval_secs {} must be between 1 and 3600",
                self.rotation_interval_secs
            )));
        }

        if !self.placeholder_base.starts_with("http://")
            && !self.placeholder_base.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(
                "placeholder_base must be an http(s) URL".to_string(),
            ));
        }

        Ok(())
    }

    pub fn rotation_interval(&self) -> Duration {
        Duration::from_secs(self.rotation_interval_secs)
    }
}
