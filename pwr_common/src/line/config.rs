//! Button configuration types.
//!
//! This module contains the configuration loaded from `config.toml`:
//! - `ButtonConfig` - Top-level configuration
//! - `DriverConfig` - Which line driver to use and how to open it
//! - `HostConfig` - One managed host: its line and press timings

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    DEFAULT_CONSUMER, DEFAULT_DRIVER, DEFAULT_GPIO_CHIP, DEFAULT_LONG_PRESS_SECS,
    DEFAULT_SHORT_PRESS_SECS,
};
use crate::line::types::LineId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

fn default_driver() -> String {
    DEFAULT_DRIVER.to_string()
}

fn default_chip() -> PathBuf {
    PathBuf::from(DEFAULT_GPIO_CHIP)
}

fn default_consumer() -> String {
    DEFAULT_CONSUMER.to_string()
}

fn default_short_press_secs() -> f64 {
    DEFAULT_SHORT_PRESS_SECS
}

fn default_long_press_secs() -> f64 {
    DEFAULT_LONG_PRESS_SECS
}

/// Main configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ButtonConfig {
    /// Logging and service identity.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Line driver selection.
    #[serde(default)]
    pub driver: DriverConfig,

    /// Managed hosts, in priority order. The first one is the default target.
    #[serde(default = "default_hosts")]
    pub hosts: Vec<HostConfig>,
}

/// Driver section (`[driver]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    /// Registered driver name ("cdev" or "simulation").
    #[serde(default = "default_driver")]
    pub name: String,

    /// GPIO character device path.
    #[serde(default = "default_chip")]
    pub chip: PathBuf,

    /// Consumer label for requested lines.
    #[serde(default = "default_consumer")]
    pub consumer: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            name: default_driver(),
            chip: default_chip(),
            consumer: default_consumer(),
        }
    }
}

/// One managed host (`[[hosts]]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Host name used to address commands.
    pub name: String,

    /// Output line wired to the host's power button header.
    pub line: LineId,

    /// Short press duration (power on), seconds.
    #[serde(default = "default_short_press_secs")]
    pub short_press_secs: f64,

    /// Long press duration (forced power off), seconds.
    #[serde(default = "default_long_press_secs")]
    pub long_press_secs: f64,

    /// Line is wired active-low (e.g. through an inverting opto-coupler).
    #[serde(default)]
    pub active_low: bool,
}

impl HostConfig {
    /// Create a host entry with default press timings.
    pub fn new(name: impl Into<String>, line: u32) -> Self {
        Self {
            name: name.into(),
            line: LineId(line),
            short_press_secs: DEFAULT_SHORT_PRESS_SECS,
            long_press_secs: DEFAULT_LONG_PRESS_SECS,
            active_low: false,
        }
    }

    /// Short press as a `Duration`.
    ///
    /// # Errors
    /// `ConfigError::ValidationError` if `short_press_secs` is not a positive,
    /// representable number of seconds.
    pub fn short_press(&self) -> Result<Duration, ConfigError> {
        press_duration(&self.name, "short_press_secs", self.short_press_secs)
    }

    /// Long press as a `Duration`. Same rules as [`HostConfig::short_press`].
    pub fn long_press(&self) -> Result<Duration, ConfigError> {
        press_duration(&self.name, "long_press_secs", self.long_press_secs)
    }

    /// Validate a single host entry.
    ///
    /// Names are single words: commands address hosts by a
    /// whitespace-separated token.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "host name cannot be empty".to_string(),
            ));
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(ConfigError::ValidationError(format!(
                "host name '{}' must not contain whitespace",
                self.name
            )));
        }
        self.short_press()?;
        self.long_press()?;
        Ok(())
    }
}

/// Press durations must be finite, positive and representable as `Duration`.
fn press_duration(host: &str, field: &str, secs: f64) -> Result<Duration, ConfigError> {
    let duration = match Duration::try_from_secs_f64(secs) {
        Ok(d) if secs > 0.0 => d,
        _ => {
            return Err(ConfigError::ValidationError(format!(
                "host '{host}': {field} must be a positive number of seconds (got {secs})"
            )));
        }
    };
    if duration.is_zero() {
        return Err(ConfigError::ValidationError(format!(
            "host '{host}': {field} rounds to zero (got {secs})"
        )));
    }
    Ok(duration)
}

fn default_hosts() -> Vec<HostConfig> {
    vec![HostConfig::new("windows", 17), HostConfig::new("linux", 27)]
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig::default(),
            driver: DriverConfig::default(),
            hosts: default_hosts(),
        }
    }
}

impl ButtonConfig {
    /// Validate the button configuration.
    ///
    /// # Validation Rules
    /// 1. Shared section valid
    /// 2. Driver name not empty
    /// 3. At least one host
    /// 4. Every host valid (name, press timings)
    /// 5. Host names unique (case-insensitive)
    /// 6. Lines unique: a line belongs to exactly one host
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.driver.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "driver name cannot be empty".to_string(),
            ));
        }

        if self.hosts.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one host must be configured".to_string(),
            ));
        }

        let mut names = HashSet::new();
        let mut lines = HashSet::new();
        for host in &self.hosts {
            host.validate()?;

            if !names.insert(host.name.to_ascii_lowercase()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate host name: {}",
                    host.name
                )));
            }
            if !lines.insert(host.line) {
                return Err(ConfigError::ValidationError(format!(
                    "{} assigned to more than one host (second: {})",
                    host.line, host.name
                )));
            }
        }

        Ok(())
    }

    /// Find a host by name (case-insensitive).
    pub fn host(&self, name: &str) -> Option<&HostConfig> {
        self.hosts.iter().find(|h| h.name.eq_ignore_ascii_case(name))
    }
}
