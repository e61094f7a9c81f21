//! Driver registry for line drivers.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving line
//! driver factories. This uses constructor-injection rather than global state.

use pwr_common::line::driver::{DriverFactory, LineDriver, LineError};
use std::collections::HashMap;
use std::sync::Arc;

use crate::drivers::register_all_drivers;

/// Registry of available line drivers.
///
/// Constructed at startup, populated via `register()`, and consulted by
/// `PowerBoard::from_config`. No global state.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in driver.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        register_all_drivers(&mut registry);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Create a driver instance by name.
    ///
    /// # Errors
    /// Returns `LineError::DriverNotFound` if no driver with the given name is registered.
    pub fn create_driver(&self, name: &str) -> Result<Arc<dyn LineDriver>, LineError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| LineError::DriverNotFound(name.to_string()))?;
        Ok(factory())
    }

    /// List all registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation;
    use pwr_common::consts::SIMULATION_DRIVER;

    #[test]
    fn registry_register_and_create() {
        let mut reg = DriverRegistry::new();
        reg.register("test_driver", simulation::create_driver);

        let driver = reg.create_driver("test_driver").expect("should create");
        assert_eq!(driver.name(), "simulation");
    }

    #[test]
    fn registry_driver_not_found() {
        let reg = DriverRegistry::new();
        let result = reg.create_driver("nonexistent");
        assert!(matches!(result, Err(LineError::DriverNotFound(_))));
    }

    #[test]
    fn registry_lists_builtins() {
        let reg = DriverRegistry::with_builtin_drivers();
        let names = reg.list_drivers();
        assert!(names.contains(&SIMULATION_DRIVER));
        #[cfg(target_os = "linux")]
        assert!(names.contains(&pwr_common::consts::CDEV_DRIVER));
    }

    #[test]
    fn factories_create_independent_instances() {
        let reg = DriverRegistry::with_builtin_drivers();
        let a = reg.create_driver("simulation").unwrap();
        let b = reg.create_driver("simulation").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut reg = DriverRegistry::new();
        reg.register("dup", simulation::create_driver);
        reg.register("dup", simulation::create_driver);
    }
}
