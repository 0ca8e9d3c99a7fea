//! # Cadence Logging Jobs Extension
//!
//! Built-in job classes that log the current UTC time on every fire.
//! Useful as heartbeats and for checking a deployment end to end.
//!
//! ## Job classes
//!
//! - `cadence_jobs_logging::LoggingBackgroundJob`
//! - `cadence_jobs_logging::LoggingBackgroundSampleJob`
//!
//! Both disallow concurrent execution.

mod jobs;

pub use jobs::{LoggingBackgroundJob, LoggingBackgroundSampleJob, LoggingJobFactory};

use std::sync::Arc;

use cadence_core::{JobClassRegistry, RegistryError};

/// Register every job class this extension provides.
pub fn register_all(registry: &JobClassRegistry) -> Result<(), RegistryError> {
    registry.register(Arc::new(LoggingJobFactory::background()))?;
    registry.register(Arc::new(LoggingJobFactory::background_sample()))?;
    Ok(())
}
