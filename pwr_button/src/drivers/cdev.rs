//! Linux GPIO character device driver.
//!
//! Drives lines through `/dev/gpiochipN` using the kernel's line request
//! API. A requested line is owned by the `LineHandle` held here; dropping
//! the handle on `release()` returns the line to the kernel.
//!
//! The chip is opened once in `init()`. Every other call takes the driver
//! lock only for the duration of one ioctl, so lines driven by different
//! controllers do not wait on each other's pulses.

use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use parking_lot::Mutex;
use pwr_common::consts::CDEV_DRIVER;
use pwr_common::line::config::DriverConfig;
use pwr_common::line::driver::{LineDriver, LineError};
use pwr_common::line::types::{Level, LineId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Default)]
struct CdevState {
    chip: Option<Chip>,
    consumer: String,
    lines: HashMap<LineId, LineHandle>,
    active_low: HashSet<LineId>,
}

/// GPIO character device driver implementing the LineDriver trait.
pub struct CdevDriver {
    state: Mutex<CdevState>,
}

impl CdevDriver {
    /// Create a driver; the chip is opened by `init()`.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CdevState::default()),
        }
    }
}

impl Default for CdevDriver {
    fn default() -> Self {
        Self::new()
    }
}

/// Factory function to create a cdev driver instance.
pub fn create_driver() -> Arc<dyn LineDriver> {
    Arc::new(CdevDriver::new())
}

impl LineDriver for CdevDriver {
    fn name(&self) -> &'static str {
        CDEV_DRIVER
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&self, config: &DriverConfig) -> Result<(), LineError> {
        let mut state = self.state.lock();
        if state.chip.is_some() {
            debug!("GPIO chip already open");
            return Ok(());
        }

        let chip = Chip::new(&config.chip).map_err(|e| {
            LineError::InitFailed(format!(
                "Failed to open GPIO chip {}: {}",
                config.chip.display(),
                e
            ))
        })?;
        info!(
            "Opened GPIO chip {} ({}, {} lines)",
            chip.name(),
            chip.label(),
            chip.num_lines()
        );

        state.chip = Some(chip);
        state.consumer = config.consumer.clone();
        Ok(())
    }

    fn configure_output(&self, line: LineId, initial: Level) -> Result<(), LineError> {
        let mut state = self.state.lock();
        if state.lines.contains_key(&line) {
            return Err(LineError::ConfigError(format!("{line} already requested")));
        }

        let mut flags = LineRequestFlags::OUTPUT;
        if state.active_low.contains(&line) {
            flags |= LineRequestFlags::ACTIVE_LOW;
        }
        let consumer = state.consumer.clone();

        let chip = state
            .chip
            .as_mut()
            .ok_or_else(|| LineError::InitFailed("GPIO chip not opened".to_string()))?;
        let handle = chip
            .get_line(line.offset())
            .and_then(|l| l.request(flags, initial.as_u8(), &consumer))
            .map_err(|e| {
                LineError::CommunicationError(format!("Failed to request {line} as output: {e}"))
            })?;

        state.lines.insert(line, handle);
        debug!("Requested {} as output ({}, consumer '{}')", line, initial, consumer);
        Ok(())
    }

    fn write_level(&self, line: LineId, level: Level) -> Result<(), LineError> {
        let state = self.state.lock();
        let handle = state
            .lines
            .get(&line)
            .ok_or(LineError::LineNotRequested(line))?;

        handle.set_value(level.as_u8()).map_err(|e| {
            LineError::CommunicationError(format!("Failed to set {line} {level}: {e}"))
        })
    }

    fn release(&self, line: LineId) -> Result<(), LineError> {
        let mut state = self.state.lock();
        match state.lines.remove(&line) {
            Some(handle) => {
                drop(handle);
                state.active_low.remove(&line);
                debug!("Released {}", line);
                Ok(())
            }
            None => Err(LineError::LineNotRequested(line)),
        }
    }

    fn level(&self, line: LineId) -> Option<Level> {
        let state = self.state.lock();
        let handle = state.lines.get(&line)?;
        handle.get_value().ok().map(Level::from_u8)
    }

    fn set_active_low(&self, line: LineId) -> Result<(), LineError> {
        let mut state = self.state.lock();
        if state.lines.contains_key(&line) {
            return Err(LineError::ConfigError(format!(
                "{line} polarity must be set before it is requested"
            )));
        }
        state.active_low.insert(line);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn configure_before_init_fails() {
        let driver = CdevDriver::new();
        assert!(matches!(
            driver.configure_output(LineId(17), Level::Low),
            Err(LineError::InitFailed(_))
        ));
    }

    #[test]
    fn write_and_release_unrequested_fail() {
        let driver = CdevDriver::new();
        assert!(matches!(
            driver.write_level(LineId(17), Level::High),
            Err(LineError::LineNotRequested(LineId(17)))
        ));
        assert!(matches!(
            driver.release(LineId(17)),
            Err(LineError::LineNotRequested(_))
        ));
        assert!(driver.level(LineId(17)).is_none());
    }

    #[test]
    fn missing_chip_reports_init_failure() {
        let driver = CdevDriver::new();
        let config = DriverConfig {
            chip: PathBuf::from("/nonexistent/gpiochip99"),
            ..DriverConfig::default()
        };
        let err = driver.init(&config).unwrap_err();
        assert!(matches!(err, LineError::InitFailed(_)));
        assert!(err.to_string().contains("gpiochip99"));
    }

    #[test]
    fn name_matches_registered_name() {
        assert_eq!(CdevDriver::new().name(), CDEV_DRIVER);
    }

    #[test]
    fn active_low_accepted_before_request() {
        let driver = CdevDriver::new();
        assert!(driver.set_active_low(LineId(5)).is_ok());
    }
}
