//! Registry of job classes.

use std::sync::Arc;

use cadence_protocols::{JobClassInfo, JobFactory};
use tracing::debug;

use super::base::{BaseRegistry, Registerable};
use crate::error::RegistryError;

impl Registerable for dyn JobFactory {
    fn registry_id(&self) -> &str {
        &self.class_info().full_name
    }
}

/// Maps fully-qualified job class identifiers to their factories.
///
/// Populated during startup; the scheduler resolves identifiers through it
/// when a job is created and again on every fire event.
pub struct JobClassRegistry {
    inner: BaseRegistry<dyn JobFactory>,
}

impl JobClassRegistry {
    pub fn new() -> Self {
        Self {
            inner: BaseRegistry::new(),
        }
    }

    pub fn register(&self, factory: Arc<dyn JobFactory>) -> Result<(), RegistryError> {
        let full_name = factory.class_info().full_name.clone();
        self.inner.register(factory)?;
        debug!("Registered job class {}", full_name);
        Ok(())
    }

    pub fn unregister(&self, full_name: &str) -> Result<(), RegistryError> {
        self.inner.unregister(full_name)
    }

    /// Look up a factory by its fully-qualified identifier.
    pub fn resolve(&self, full_name: &str) -> Option<Arc<dyn JobFactory>> {
        self.inner.get(full_name)
    }

    pub fn contains(&self, full_name: &str) -> bool {
        self.inner.contains(full_name)
    }

    /// Registered classes, sorted by identifier.
    pub fn list(&self) -> Vec<JobClassInfo> {
        let mut classes: Vec<JobClassInfo> =
            self.inner.iter().map(|f| f.class_info().clone()).collect();
        classes.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        classes
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for JobClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
