//! Top-level scheduler error type.

use thiserror::Error;

/// Errors reported by the scheduler's control surface and store.
///
/// `Validation`, `Conflict` and `NotFound` are returned synchronously to the
/// caller of a control operation. `Execution` is only ever recorded against a
/// trigger; it is never returned to the caller that created the job.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Job execution failed: {0}")]
    Execution(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Scheduler has been shut down")]
    Shutdown,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SchedulerError {
    /// Whether the error is one the caller caused (bad input or state).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SchedulerError::Validation(_) | SchedulerError::Conflict(_) | SchedulerError::NotFound(_)
        )
    }
}

impl From<serde_json::Error> for SchedulerError {
    fn from(err: serde_json::Error) -> Self {
        SchedulerError::Persistence(err.to_string())
    }
}

impl From<std::io::Error> for SchedulerError {
    fn from(err: std::io::Error) -> Self {
        SchedulerError::Persistence(err.to_string())
    }
}

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;
