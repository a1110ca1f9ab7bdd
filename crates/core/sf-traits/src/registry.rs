//! ProcessorRegistry - name to constructor map for native processors.

use crate::processor::Processor;
use hashbrown::HashMap;
use serde_json::Value;
use sf_error::{ProcessorError, Result};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builds a processor from an opaque configuration value.
pub type Constructor = Arc<dyn Fn(&Value) -> Result<Arc<dyn Processor>> + Send + Sync>;

/// Registry of native processor constructors.
///
/// Populated once at startup and then shared read-only (behind an `Arc`)
/// with every script processor and chain builder.
#[derive(Default)]
pub struct ProcessorRegistry {
    constructors: HashMap<String, Constructor>,
}

impl ProcessorRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registers a constructor under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::Duplicate`] if the name is taken.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> Result<()>
    where
        F: Fn(&Value) -> Result<Arc<dyn Processor>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.constructors.contains_key(&name) {
            return Err(ProcessorError::Duplicate(name).into());
        }

        debug!(processor = %name, "Registered processor constructor");
        self.constructors.insert(name, Arc::new(constructor));
        Ok(())
    }

    /// Builds a new processor instance.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::Unknown`] if nothing is registered under
    /// `name`, or whatever the constructor returns for a bad config.
    pub fn build(&self, name: &str, config: &Value) -> Result<Arc<dyn Processor>> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| ProcessorError::Unknown(name.to_string()))?;
        constructor(config)
    }

    /// Returns true if a constructor is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered constructors.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Returns true if the registry has no constructors.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("processors", &self.names())
            .finish()
    }
}
