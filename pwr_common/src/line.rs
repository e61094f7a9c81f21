//! Output line abstraction.
//!
//! This module contains the driver trait, level/identifier types and the
//! button configuration shared by the controller and its drivers.

pub mod config;
pub mod driver;
pub mod types;
