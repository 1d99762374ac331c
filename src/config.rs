//! Settings document
//!
//! A flat JSON object. Missing keys take their defaults and unknown keys are
//! ignored, so hand-edited files from older versions keep loading.

use crate::clicker::ClickerSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize config: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the `*.png` templates.
    pub png_dir: String,
    /// Seconds to wait after each click.
    pub click_interval: f64,
    pub loop_times: u32,
    /// Minimum normalized correlation for a hit, in [0, 1].
    pub threshold: f32,
    /// Seconds to keep looking for one template before moving on.
    pub wait_time: f64,
    /// Skip the post-click `click_interval` pause.
    pub immediate_click: bool,
    pub log_level: String,
    pub log_file: String,
    /// Bytes before the log file rolls over; 0 disables rotation.
    pub max_log_size: u64,
    pub backup_count: u32,
    /// Drop the last recorded click on stop (the click on the stop control).
    pub discard_stop_click: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            png_dir: "templates/png".to_string(),
            click_interval: 0.1,
            loop_times: 1,
            threshold: 0.8,
            wait_time: 5.0,
            immediate_click: false,
            log_level: "INFO".to_string(),
            log_file: "data/logs/app.log".to_string(),
            max_log_size: 5 * 1024 * 1024,
            backup_count: 3,
            discard_stop_click: true,
        }
    }
}

impl Settings {
    /// Load the document at `path`. A missing file yields defaults; a file
    /// that exists but does not parse or validate is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!("Config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;

        log::debug!("Config loaded from {}", path.display());
        Ok(settings)
    }

    /// Like [`Settings::load`], but any failure falls back to defaults.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            log::warn!("⚠️ {}. Using default config", e);
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.click_interval.is_finite() || self.click_interval < 0.0 {
            return Err(ConfigError::invalid("click_interval", "must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::invalid("threshold", "must be between 0 and 1"));
        }
        if !self.wait_time.is_finite() || self.wait_time < 0.0 {
            return Err(ConfigError::invalid("wait_time", "must be >= 0"));
        }
        if self.loop_times < 1 {
            return Err(ConfigError::invalid("loop_times", "must be >= 1"));
        }
        if self.png_dir.trim().is_empty() {
            return Err(ConfigError::invalid("png_dir", "must not be empty"));
        }
        if self.log_file.trim().is_empty() {
            return Err(ConfigError::invalid("log_file", "must not be empty"));
        }
        if parse_level(&self.log_level).is_none() {
            return Err(ConfigError::invalid(
                "log_level",
                format!("unknown level '{}'", self.log_level),
            ));
        }
        Ok(())
    }

    /// Validate, then write pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(write_err)?;

        log::info!("💾 Config saved to {}", path.display());
        Ok(())
    }

    /// The engine's view of these settings.
    pub fn clicker_settings(&self) -> ClickerSettings {
        ClickerSettings {
            png_dir: PathBuf::from(&self.png_dir),
            click_interval: Duration::from_secs_f64(self.click_interval.max(0.0)),
            loop_times: self.loop_times.max(1),
            threshold: self.threshold.clamp(0.0, 1.0),
            wait_time: Duration::from_secs_f64(self.wait_time.max(0.0)),
            immediate_click: self.immediate_click,
        }
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        parse_level(&self.log_level).unwrap_or(log::LevelFilter::Info)
    }
}

fn parse_level(level: &str) -> Option<log::LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "warning" => Some(log::LevelFilter::Warn),
        "critical" => Some(log::LevelFilter::Error),
        other => other.parse().ok(),
    }
}
