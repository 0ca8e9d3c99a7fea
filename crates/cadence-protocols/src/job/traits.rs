//! Job and job factory traits.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ConcurrencyPolicy, JobClassInfo, JobExecutionContext};
use crate::error::JobExecutionError;

/// Executable job logic.
///
/// A fresh instance is obtained from the class's [`JobFactory`] for every
/// fire event.
#[async_trait]
pub trait Job: Send + Sync {
    async fn execute(&self, ctx: &JobExecutionContext) -> Result<(), JobExecutionError>;
}

/// Produces job instances for one registered job class.
pub trait JobFactory: Send + Sync {
    /// Class metadata; `full_name` is the registry key.
    fn class_info(&self) -> &JobClassInfo;

    /// Concurrency policy applied to every job created from this class.
    fn concurrency_policy(&self) -> ConcurrencyPolicy {
        ConcurrencyPolicy::AllowConcurrent
    }

    /// Default description for jobs of this class.
    fn description(&self) -> Option<String> {
        None
    }

    /// Create the job instance for one fire event.
    fn create(&self) -> Arc<dyn Job>;
}
