//! Configuration validation.

use std::collections::HashSet;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::schema::{Config, StoreBackendKind};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Largest interval a trigger can represent (millisecond time deltas).
const MAX_INTERVAL_SECONDS: i64 = i64::MAX / 1_000;

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_scheduler(config, &mut result);
        Self::validate_store(config, &mut result);
        Self::validate_logging(config, &mut result);
        Self::validate_jobs(config, &mut result);

        Ok(result)
    }

    fn validate_scheduler(config: &Config, result: &mut ValidationResult) {
        let scheduler = &config.scheduler;

        if scheduler.max_workers == 0 {
            result.add_error(ValidationError::new(
                "scheduler.max_workers",
                "max_workers must be greater than 0",
            ));
        }

        if scheduler.max_workers > 1000 {
            result.add_warning(ValidationWarning::new(
                "scheduler.max_workers",
                "max_workers is very high (>1000)",
            ));
        }

        if scheduler.idle_wait_ms == 0 {
            result.add_error(ValidationError::new(
                "scheduler.idle_wait_ms",
                "idle_wait_ms must be greater than 0",
            ));
        }

        if scheduler.instance_name.trim().is_empty() {
            result.add_error(ValidationError::new(
                "scheduler.instance_name",
                "Instance name cannot be empty",
            ));
        }

        if scheduler.misfire_threshold_ms == 0 {
            result.add_warning(ValidationWarning::new(
                "scheduler.misfire_threshold_ms",
                "misfire threshold is 0, every late trigger counts as misfired",
            ));
        }

        if !scheduler.shutdown.wait_for_jobs && scheduler.shutdown.timeout_secs > 0 {
            result.add_warning(ValidationWarning::new(
                "scheduler.shutdown.timeout_secs",
                "timeout_secs is ignored when wait_for_jobs is false",
            ));
        }
    }

    fn validate_store(config: &Config, result: &mut ValidationResult) {
        match config.store.backend {
            StoreBackendKind::File => {
                let missing = config
                    .store
                    .path
                    .as_deref()
                    .is_none_or(|p| p.trim().is_empty());
                if missing {
                    result.add_error(ValidationError::new(
                        "store.path",
                        "File backend requires a path",
                    ));
                }
            }
            StoreBackendKind::Memory => {
                if config.store.path.is_some() {
                    result.add_warning(ValidationWarning::new(
                        "store.path",
                        "path is ignored by the memory backend",
                    ));
                }
            }
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        if config.logging.level.trim().is_empty() {
            result.add_error(ValidationError::new(
                "logging.level",
                "Log level cannot be empty",
            ));
        }
    }

    fn validate_jobs(config: &Config, result: &mut ValidationResult) {
        let mut seen = HashSet::new();

        for (i, job) in config.jobs.iter().enumerate() {
            let path = format!("jobs[{}]", i);

            if job.name.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    "Job name cannot be empty",
                ));
            }

            if job.job_class.trim().is_empty() {
                result.add_error(ValidationError::new(
                    format!("{}.job_class", path),
                    "Job class cannot be empty",
                ));
            }

            let group = job.group.as_deref().unwrap_or("DEFAULT");
            if !seen.insert((group.to_string(), job.name.clone())) {
                result.add_error(ValidationError::new(
                    format!("{}.name", path),
                    format!("Duplicate job '{}.{}'", group, job.name),
                ));
            }

            match (job.interval_seconds, job.cron.as_deref()) {
                (Some(_), Some(_)) => {
                    result.add_error(ValidationError::new(
                        path.clone(),
                        "Specify either interval_seconds or cron, not both",
                    ));
                }
                (None, None) => {
                    result.add_error(ValidationError::new(
                        path.clone(),
                        "One of interval_seconds or cron is required",
                    ));
                }
                (Some(interval), None) if interval <= 0 => {
                    result.add_error(ValidationError::new(
                        format!("{}.interval_seconds", path),
                        "interval_seconds must be greater than 0",
                    ));
                }
                (Some(interval), None) if interval > MAX_INTERVAL_SECONDS => {
                    result.add_error(ValidationError::new(
                        format!("{}.interval_seconds", path),
                        format!("interval_seconds must be at most {}", MAX_INTERVAL_SECONDS),
                    ));
                }
                (None, Some(expr)) => {
                    if let Err(e) = cron::Schedule::from_str(expr) {
                        result.add_error(ValidationError::new(
                            format!("{}.cron", path),
                            format!("Invalid cron expression: {}", e),
                        ));
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
