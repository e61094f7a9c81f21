//! Prelude module for common re-exports.
//!
//! ```rust
//! use pwr_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::line::config::{ButtonConfig, DriverConfig, HostConfig};

// ─── Lines ──────────────────────────────────────────────────────────
pub use crate::line::driver::{DriverFactory, LineDriver, LineError};
pub use crate::line::types::{Level, LineId};
