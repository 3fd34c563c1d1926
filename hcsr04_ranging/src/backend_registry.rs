//! Registry of line backends.
//!
//! Maps backend names from the `[backend]` section to factories. Built at
//! startup and passed by value; there is no global registry.

use crate::error::LineError;
use crate::lines::LineProvider;
use crate::lines::simulation::SimulatedLines;
use hcsr04_common::ranging::BackendConfig;
use std::collections::HashMap;
use tracing::warn;

/// Constructor for a line backend.
pub type BackendFactory = fn(&BackendConfig) -> Result<Box<dyn LineProvider>, LineError>;

/// Registry of available line backends.
pub struct BackendRegistry {
    factories: HashMap<&'static str, BackendFactory>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every backend compiled into this build.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("simulation", create_simulation);
        #[cfg(feature = "rppal")]
        registry.register("rppal", create_rppal);
        registry
    }

    /// Register a backend factory.
    ///
    /// # Panics
    /// Panics if a backend with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: BackendFactory) {
        if self.factories.contains_key(name) {
            panic!("Line backend '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Create the backend named in `config`.
    ///
    /// # Errors
    /// `LineError::UnknownBackend` if no backend with that name is registered,
    /// or whatever the factory reports.
    pub fn create(&self, config: &BackendConfig) -> Result<Box<dyn LineProvider>, LineError> {
        let Some(factory) = self.factories.get(config.name.as_str()) else {
            let mut known = self.list_backends();
            known.sort_unstable();
            warn!("Unknown backend '{}', available: {:?}", config.name, known);
            return Err(LineError::UnknownBackend(config.name.clone()));
        };
        factory(config)
    }

    /// List all registered backend names.
    pub fn list_backends(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn create_simulation(config: &BackendConfig) -> Result<Box<dyn LineProvider>, LineError> {
    Ok(Box::new(SimulatedLines::from_config(config)))
}

#[cfg(feature = "rppal")]
fn create_rppal(_config: &BackendConfig) -> Result<Box<dyn LineProvider>, LineError> {
    Ok(Box::new(crate::lines::rppal::RppalLines::new()?))
}
