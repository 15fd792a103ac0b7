//! Engine configuration: pacing delays and where the record lives.

use std::path::Path;
use std::time::Duration;

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::PlaybackTiming;

/// Timing and storage settings for a [`GameEngine`](crate::GameEngine).
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct EngineConfig {
    /// How long each signal stays lit during playback, in milliseconds.
    #[serde(default = "default_signal_on_ms")]
    signal_on_ms: u64,

    /// Dark gap after each signal during playback, in milliseconds.
    #[serde(default = "default_signal_off_ms")]
    signal_off_ms: u64,

    /// How long a pressed color stays lit as feedback, in milliseconds.
    #[serde(default = "default_feedback_ms")]
    feedback_ms: u64,

    /// Pause between a completed round and the next playback, in milliseconds.
    #[serde(default = "default_celebration_ms")]
    celebration_ms: u64,

    /// SQLite file holding the best-score record.
    #[serde(default = "default_record_db_path")]
    record_db_path: String,
}

fn default_signal_on_ms() -> u64 {
    500
}

fn default_signal_off_ms() -> u64 {
    250
}

fn default_feedback_ms() -> u64 {
    300
}

fn default_celebration_ms() -> u64 {
    800
}

fn default_record_db_path() -> String {
    "simon_record.db".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            signal_on_ms: default_signal_on_ms(),
            signal_off_ms: default_signal_off_ms(),
            feedback_ms: default_feedback_ms(),
            celebration_ms: default_celebration_ms(),
            record_db_path: default_record_db_path(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_toml_str(&content)?;
        info!(record_db_path = %config.record_db_path, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))
    }

    /// On/off durations for sequence playback.
    pub fn playback_timing(&self) -> PlaybackTiming {
        PlaybackTiming::new(
            Duration::from_millis(self.signal_on_ms),
            Duration::from_millis(self.signal_off_ms),
        )
    }

    /// Feedback illumination delay.
    pub fn feedback(&self) -> Duration {
        Duration::from_millis(self.feedback_ms)
    }

    /// Pause after a completed round.
    pub fn celebration(&self) -> Duration {
        Duration::from_millis(self.celebration_ms)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
