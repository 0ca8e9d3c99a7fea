//! Job execution errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the scheduler should do with the firing trigger (or its job) once a
/// failed execution has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionInstruction {
    /// Keep the schedule running.
    #[default]
    Noop,
    /// Remove the trigger that fired.
    DeleteTrigger,
    /// Remove the job and every trigger bound to it.
    DeleteJob,
}

/// Failure reported by job logic.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct JobExecutionError {
    pub message: String,
    pub instruction: CompletionInstruction,
}

impl JobExecutionError {
    /// A failure that leaves the schedule untouched.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            instruction: CompletionInstruction::Noop,
        }
    }

    /// A failure that also unschedules the firing trigger.
    pub fn unschedule_trigger(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            instruction: CompletionInstruction::DeleteTrigger,
        }
    }

    /// A failure that also deletes the job.
    pub fn delete_job(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            instruction: CompletionInstruction::DeleteJob,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_failure_keeps_schedule() {
        let err = JobExecutionError::new("connection refused");
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(err.instruction, CompletionInstruction::Noop);
    }

    #[test]
    fn test_unschedule_instructions() {
        assert_eq!(
            JobExecutionError::unschedule_trigger("done").instruction,
            CompletionInstruction::DeleteTrigger
        );
        assert_eq!(
            JobExecutionError::delete_job("gone").instruction,
            CompletionInstruction::DeleteJob
        );
    }
}
