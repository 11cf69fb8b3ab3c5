//! # Settings Module
//!
//! ## Purpose
//! Startup configuration of the `spectrokit` binary, read from a JSON file
//! (`spectrokit_config.json` in the working directory unless another path is
//! given with `--config`).
//!
//! ## Configuration Format
//! ```json
//! {
//!   "element_overrides": "my_masses.txt",
//!   "log_level": "info"
//! }
//! ```
//! Both fields are optional. A missing config file yields the defaults; a file
//! that exists but cannot be parsed is an error.

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "spectrokit_config.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unknown log level '{0}', expected one of off, error, warn, info, debug, trace")]
    LogLevel(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// File with an `ELEMENTS` section overriding built-in atomic masses
    pub element_overrides: Option<String>,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            element_overrides: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from `config_file`, or returns the defaults if the file
    /// does not exist.
    pub fn load(config_file: &str) -> Result<Settings, SettingsError> {
        if !Path::new(config_file).exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(config_file).map_err(|source| SettingsError::Io {
            path: config_file.to_string(),
            source,
        })?;
        let settings: Settings =
            serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
                path: config_file.to_string(),
                source,
            })?;
        settings.level_filter()?;
        Ok(settings)
    }

    pub fn level_filter(&self) -> Result<LevelFilter, SettingsError> {
        self.log_level
            .parse::<LevelFilter>()
            .map_err(|_| SettingsError::LogLevel(self.log_level.clone()))
    }
}
