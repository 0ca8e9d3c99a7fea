//! Logging job implementations.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use cadence_protocols::{
    ConcurrencyPolicy, Job, JobClassInfo, JobExecutionContext, JobExecutionError, JobFactory,
};

/// Logs a timestamp every time it fires.
pub struct LoggingBackgroundJob;

#[async_trait]
impl Job for LoggingBackgroundJob {
    async fn execute(&self, ctx: &JobExecutionContext) -> Result<(), JobExecutionError> {
        info!(
            job = %ctx.job_key,
            "LoggingBackgroundJob is working at {}",
            Utc::now().to_rfc3339()
        );
        Ok(())
    }
}

/// Sample variant of [`LoggingBackgroundJob`], registered under its own class name.
pub struct LoggingBackgroundSampleJob;

#[async_trait]
impl Job for LoggingBackgroundSampleJob {
    async fn execute(&self, ctx: &JobExecutionContext) -> Result<(), JobExecutionError> {
        info!(
            job = %ctx.job_key,
            fire = ctx.times_triggered,
            "LoggingBackgroundSampleJob is working at {}",
            Utc::now().to_rfc3339()
        );
        Ok(())
    }
}

/// Factory for the logging job classes.
pub struct LoggingJobFactory {
    info: JobClassInfo,
    description: &'static str,
    make: fn() -> Arc<dyn Job>,
}

impl LoggingJobFactory {
    pub fn background() -> Self {
        Self {
            info: JobClassInfo::new(
                "LoggingBackgroundJob",
                "cadence_jobs_logging::LoggingBackgroundJob",
            ),
            description: "Logs the current UTC time",
            make: || Arc::new(LoggingBackgroundJob),
        }
    }

    pub fn background_sample() -> Self {
        Self {
            info: JobClassInfo::new(
                "LoggingBackgroundSampleJob",
                "cadence_jobs_logging::LoggingBackgroundSampleJob",
            ),
            description: "Sample job that logs the current UTC time",
            make: || Arc::new(LoggingBackgroundSampleJob),
        }
    }
}

impl JobFactory for LoggingJobFactory {
    fn class_info(&self) -> &JobClassInfo {
        &self.info
    }

    fn concurrency_policy(&self) -> ConcurrencyPolicy {
        ConcurrencyPolicy::DisallowConcurrent
    }

    fn description(&self) -> Option<String> {
        Some(self.description.to_string())
    }

    fn create(&self) -> Arc<dyn Job> {
        (self.make)()
    }
}
