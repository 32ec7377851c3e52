//! Core runtime configuration.
//!
//! # Responsibility
//! - Hold the switches the shell passes at startup (list display mode,
//!   default memo color, log level and directory, ad capability).
//! - Parse JSON configuration with defaults for every field.
//!
//! # Invariants
//! - A validated config always carries a lowercase `#rrggbb` default color.
//! - Unknown keys are rejected so typos fail loudly.

use crate::logging::{init_logging, normalize_level, LoggingError};
use crate::model::memo::{normalize_color, DEFAULT_MEMO_COLOR};
use crate::projection::grouping::GroupDisplayMode;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Ad slot configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdConfig {
    pub enabled: bool,
    /// Ad unit identifier. Required when `enabled`.
    pub unit_id: Option<String>,
}

/// Startup configuration for the memo core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub group_display_mode: GroupDisplayMode,
    /// Color written on new memos whose group has no color yet.
    pub default_color: String,
    pub log_level: String,
    /// Absolute directory for rolling logs. Logging stays off when absent.
    pub log_dir: Option<String>,
    pub ads: AdConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            group_display_mode: GroupDisplayMode::default(),
            default_color: DEFAULT_MEMO_COLOR.to_string(),
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
            ads: AdConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Parses and validates a JSON document. Missing keys take defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let parsed: Self = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_json::from_str(raw).map_err(ConfigError::Parse)?
        };
        parsed.validated()
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json_str(&raw)
    }

    /// Starts file logging at `log_level` when `log_dir` is set.
    ///
    /// Returns whether logging was (or already is) active with these settings.
    pub fn start_logging(&self) -> Result<bool, LoggingError> {
        match self.log_dir.as_deref() {
            Some(log_dir) => init_logging(&self.log_level, log_dir).map(|()| true),
            None => Ok(false),
        }
    }

    /// Normalizes color/level values and rejects invalid ones.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.default_color = normalize_color(&self.default_color)
            .map_err(|err| ConfigError::Invalid(format!("default_color: {err}")))?;
        self.log_level = normalize_level(&self.log_level)
            .map_err(|err| ConfigError::Invalid(format!("log_level: {err}")))?
            .to_string();
        Ok(self)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}
