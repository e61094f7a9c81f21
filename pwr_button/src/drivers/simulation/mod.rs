//! Simulation driver module.
//!
//! This module provides an in-memory line driver for development and testing
//! without GPIO hardware.

mod driver;
mod journal;

pub use driver::SimulationDriver;
pub use journal::{LineEvent, LineOp, DEFAULT_JOURNAL_CAPACITY};

use pwr_common::line::driver::LineDriver;
use std::sync::Arc;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Arc<dyn LineDriver> {
    Arc::new(SimulationDriver::new())
}
