//! TOML configuration for the button service.
//!
//! Any `Deserialize` type gets [`ConfigLoader`] for free. The `[shared]`
//! table ([`SharedConfig`]) holds what every deployment sets: log verbosity
//! and the instance name that shows up in logs.
//!
//! ```rust,no_run
//! use pwr_common::config::{ConfigError, ConfigLoader, SharedConfig};
//! use serde::Deserialize;
//! use std::path::Path;
//!
//! #[derive(Debug, Deserialize)]
//! struct Rack {
//!     shared: SharedConfig,
//!     line: u32,
//! }
//!
//! fn main() -> Result<(), ConfigError> {
//!     let rack = Rack::load(Path::new("/etc/pwr-button/rack.toml"))?;
//!     rack.shared.validate()?;
//!     println!("{} drives line {}", rack.shared.service_name, rack.line);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::consts::DEFAULT_SERVICE_NAME;

/// Failure to obtain a usable configuration.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No file at the given path. Callers may fall back to defaults.
    #[error("Configuration file not found")]
    FileNotFound,

    /// Unreadable file, bad TOML, wrong type or unknown key.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Well-formed but unusable values.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Minimum severity that reaches the log, written lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Individual simulated line writes.
    Trace,
    /// Line requests, releases and config loading.
    Debug,
    /// Lifecycle and completed presses.
    #[default]
    Info,
    /// Cleanup failures, failed requests and suspicious timings.
    Warn,
    /// Fatal startup and shutdown failures only.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// The `[shared]` table. Both keys are optional; misspelled keys are errors.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "pwr-button-rack-2"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SharedConfig {
    /// Log verbosity; `-v` on the command line overrides it.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Instance name used in log lines.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Reject an empty `service_name`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read and deserialize a TOML file.
///
/// A missing file maps to `FileNotFound`; any other I/O or decode failure
/// maps to `ParseError`. Loading never validates; call the type's own
/// `validate()` afterwards.
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Read `path` and decode it.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound,
            _ => ConfigError::ParseError(format!("{}: {}", path.display(), e)),
        })?;

        Self::from_toml(&content)
    }

    /// Decode an in-memory TOML document.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
