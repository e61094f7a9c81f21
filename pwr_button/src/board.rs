//! Power board: one driver, one controller per configured host.
//!
//! The board owns the cleanup scope. Every controller it hands out is
//! initialized, and every one of them is cleaned up on `shutdown()` or when
//! the board is dropped.

use pwr_common::config::ConfigError;
use pwr_common::line::config::ButtonConfig;
use pwr_common::line::driver::{LineDriver, LineError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::controller::{ControllerError, LineController};
use crate::driver_registry::DriverRegistry;

/// Errors raised while building or tearing down a [`PowerBoard`].
#[derive(Debug, Error)]
pub enum BoardError {
    /// Configuration rejected.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Driver could not be created or initialized.
    #[error("Driver error: {0}")]
    Driver(#[from] LineError),

    /// A host's controller failed.
    #[error("Host '{host}': {source}")]
    Controller {
        /// Host name.
        host: String,
        /// Underlying controller failure.
        #[source]
        source: ControllerError,
    },
}

/// A configured host bound to its controller.
#[derive(Debug, Clone)]
pub struct BoundHost {
    name: String,
    controller: Arc<LineController>,
}

impl BoundHost {
    /// Host name as configured.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Controller driving this host's power button line.
    pub fn controller(&self) -> &Arc<LineController> {
        &self.controller
    }
}

/// Owns the line driver and one initialized controller per host.
pub struct PowerBoard {
    driver: Arc<dyn LineDriver>,
    hosts: Vec<BoundHost>,
}

impl PowerBoard {
    /// Build a board using the driver named in `config`, or `driver_override`.
    pub fn from_config(
        config: &ButtonConfig,
        registry: &DriverRegistry,
        driver_override: Option<&str>,
    ) -> Result<Self, BoardError> {
        let name = driver_override.unwrap_or(&config.driver.name);
        let driver = registry.create_driver(name)?;
        info!("Created driver: {} v{}", driver.name(), driver.version());
        Self::with_driver(config, driver)
    }

    /// Build a board around an existing driver.
    ///
    /// Validates `config`, initializes the driver, then creates and
    /// initializes one controller per host in config order. If any host
    /// fails, the hosts already initialized are cleaned up before the error
    /// is returned.
    pub fn with_driver(
        config: &ButtonConfig,
        driver: Arc<dyn LineDriver>,
    ) -> Result<Self, BoardError> {
        config.validate()?;
        driver.init(&config.driver)?;

        // Drop runs shutdown() on early return, releasing hosts bound so far.
        let mut board = Self {
            driver,
            hosts: Vec::with_capacity(config.hosts.len()),
        };

        for host in &config.hosts {
            if host.long_press_secs < host.short_press_secs {
                warn!(
                    "Host '{}': long press ({}s) is shorter than short press ({}s)",
                    host.name, host.long_press_secs, host.short_press_secs
                );
            }

            let bind_err = |source| BoardError::Controller {
                host: host.name.clone(),
                source,
            };
            let controller = LineController::new(
                host.line,
                host.short_press()?,
                host.long_press()?,
                Arc::clone(&board.driver),
            )
            .map_err(bind_err)?
            .with_active_low(host.active_low);

            let controller = Arc::new(controller);
            controller.initialize().map_err(bind_err)?;
            board.hosts.push(BoundHost {
                name: host.name.clone(),
                controller,
            });
        }

        info!(
            "Power board ready: {} host(s) on driver '{}'",
            board.hosts.len(),
            board.driver.name()
        );
        Ok(board)
    }

    /// Controller for `name` (case-insensitive).
    pub fn controller(&self, name: &str) -> Option<&Arc<LineController>> {
        self.hosts
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| &h.controller)
    }

    /// First configured host.
    pub fn default_host(&self) -> Option<&BoundHost> {
        self.hosts.first()
    }

    /// All hosts in config order.
    pub fn hosts(&self) -> &[BoundHost] {
        &self.hosts
    }

    /// Name of the active driver.
    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    /// Clean up every controller.
    ///
    /// Waits for in-flight pulses. Every host is attempted; each failure is
    /// logged and the first one is returned. Calling again is a no-op.
    pub fn shutdown(&self) -> Result<(), BoardError> {
        let mut first = None;
        for host in &self.hosts {
            if let Err(source) = host.controller.cleanup() {
                warn!("Cleanup of host '{}' failed: {}", host.name, source);
                first.get_or_insert(BoardError::Controller {
                    host: host.name.clone(),
                    source,
                });
            }
        }
        first.map_or(Ok(()), Err)
    }
}

impl Drop for PowerBoard {
    fn drop(&mut self) {
        // Failures were already logged by shutdown().
        let _ = self.shutdown();
    }
}

impl std::fmt::Debug for PowerBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerBoard")
            .field("driver", &self.driver.name())
            .field("hosts", &self.hosts)
            .finish()
    }
}
