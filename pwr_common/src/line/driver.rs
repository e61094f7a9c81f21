//! Line driver trait and error types.
//!
//! This module defines:
//! - `LineDriver` trait - Interface for pluggable output line backends
//! - `LineError` enum - Error types for line operations
//! - `DriverFactory` type alias - Factory function type

use crate::line::config::DriverConfig;
use crate::line::types::{Level, LineId};
use std::sync::Arc;
use thiserror::Error;

/// Error types for line driver operations.
#[derive(Debug, Clone, Error)]
pub enum LineError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Hardware communication error
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// The line was never configured as output, or has been released
    #[error("{0} is not requested as output")]
    LineNotRequested(LineId),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Arc<dyn LineDriver>;

/// Trait defining the interface for output line drivers.
///
/// One driver instance represents one platform GPIO resource (a chip, or a
/// simulated bank) and is shared by every line controller bound to it, so
/// all methods take `&self`. Implementations keep per-line state behind
/// their own locks, held only for the duration of a single call.
///
/// # Lifecycle
///
/// 1. `init()` - Called once by the composing layer before any line is used
/// 2. `configure_output()` - Once per line, before any write
/// 3. `write_level()` - Any number of times
/// 4. `release()` - Once per line at teardown
///
/// # Timing Contracts
///
/// | Operation | Blocking | Notes |
/// |-----------|----------|-------|
/// | `init()` | May block | Opens device files |
/// | `configure_output()` | May block | Kernel line request |
/// | `write_level()` | Short | Must not sleep |
/// | `release()` | Short | |
pub trait LineDriver: Send + Sync {
    /// Returns the driver's unique identifier (e.g., "simulation", "cdev").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// One-time platform setup.
    ///
    /// Idempotent: calling it again after a successful call is a no-op.
    ///
    /// # Errors
    /// Return `LineError::InitFailed` if the platform resource cannot be opened.
    fn init(&self, config: &DriverConfig) -> Result<(), LineError>;

    /// Prepare `line` as an output and drive it to `initial`.
    fn configure_output(&self, line: LineId, initial: Level) -> Result<(), LineError>;

    /// Set the electrical level of a configured line.
    fn write_level(&self, line: LineId, level: Level) -> Result<(), LineError>;

    /// Release the line resource. The line must be re-configured before reuse.
    fn release(&self, line: LineId) -> Result<(), LineError>;

    /// Current logical level of `line`, if the driver can read it back.
    /// Default: None
    fn level(&self, _line: LineId) -> Option<Level> {
        None
    }

    /// Mark `line` as active-low so logical `High` drives the pin low.
    ///
    /// Must be called before `configure_output`. Default: unsupported, returns
    /// `LineError::ConfigError`.
    fn set_active_low(&self, line: LineId) -> Result<(), LineError> {
        Err(LineError::ConfigError(format!(
            "driver '{}' does not support active-low {}",
            self.name(),
            line
        )))
    }
}
