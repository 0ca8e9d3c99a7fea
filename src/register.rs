//! Job class registration for the Cadence binary.

use cadence_core::{JobClassRegistry, RegistryError};
use tracing::debug;

/// Build the registry of job classes this binary ships with.
pub(crate) fn builtin_registry() -> Result<JobClassRegistry, RegistryError> {
    let registry = JobClassRegistry::new();
    cadence_jobs_logging::register_all(&registry)?;
    debug!("Registered {} job classes", registry.len());
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_has_logging_jobs() {
        let registry = builtin_registry().unwrap();
        assert!(registry.contains("cadence_jobs_logging::LoggingBackgroundJob"));
        assert!(registry.contains("cadence_jobs_logging::LoggingBackgroundSampleJob"));
    }
}
