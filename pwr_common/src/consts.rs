//! Workspace-wide constants.
//!
//! Single source of truth for default paths, labels and press timings.

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/pwr_button/config.toml";

/// Default service name used in logs.
pub const DEFAULT_SERVICE_NAME: &str = "pwr-button";

/// Default GPIO character device.
pub const DEFAULT_GPIO_CHIP: &str = "/dev/gpiochip0";

/// Consumer label attached to requested GPIO lines (visible in `gpioinfo`).
pub const DEFAULT_CONSUMER: &str = "pwr_button";

/// Name of the Linux GPIO character device driver.
pub const CDEV_DRIVER: &str = "cdev";

/// Name of the in-memory simulation driver.
pub const SIMULATION_DRIVER: &str = "simulation";

/// Default driver name.
pub const DEFAULT_DRIVER: &str = CDEV_DRIVER;

/// Default short press (power on), in seconds.
pub const DEFAULT_SHORT_PRESS_SECS: f64 = 0.5;

/// Default long press (forced power off), in seconds.
pub const DEFAULT_LONG_PRESS_SECS: f64 = 5.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_defaults_are_consistent() {
        assert!(DEFAULT_SHORT_PRESS_SECS > 0.0);
        assert!(DEFAULT_LONG_PRESS_SECS > DEFAULT_SHORT_PRESS_SECS);
    }

    #[test]
    fn default_driver_is_cdev() {
        assert_eq!(DEFAULT_DRIVER, CDEV_DRIVER);
        assert_ne!(CDEV_DRIVER, SIMULATION_DRIVER);
    }
}
