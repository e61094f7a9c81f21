//! Line driver implementations.
//!
//! This module contains all line driver implementations:
//!
//! - [`simulation`] - In-memory driver for development and testing
//! - [`cdev`] - Linux GPIO character device driver (Linux only)
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `LineDriver` trait from `pwr_common::line::driver`
//! 3. Register the driver in `register_all_drivers()`

#[cfg(target_os = "linux")]
pub mod cdev;
pub mod simulation;

use crate::driver_registry::DriverRegistry;
#[cfg(target_os = "linux")]
use pwr_common::consts::CDEV_DRIVER;
use pwr_common::consts::SIMULATION_DRIVER;

/// Register all built-in drivers.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register(SIMULATION_DRIVER, simulation::create_driver);

    #[cfg(target_os = "linux")]
    registry.register(CDEV_DRIVER, cdev::create_driver);
}
