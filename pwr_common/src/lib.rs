//! pwr_button Common Library
//!
//! This crate provides the line driver contract, shared constants and
//! configuration loading utilities for the pwr_button workspace.
//!
//! # Module Structure
//!
//! - [`line`] - Line driver trait, level types and button configuration
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Default paths and press timings
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use pwr_common::prelude::*;
//!
//! let config = ButtonConfig::default();
//! assert!(config.validate().is_ok());
//! ```

pub mod config;
pub mod consts;
pub mod line;
pub mod prelude;
