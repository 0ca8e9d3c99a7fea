//! Fire events in flight.

use cadence_protocols::{CompletionInstruction, JobExecutionContext, JobExecutionError, TriggerKey};
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::job::JobDefinition;

/// Result of running a job once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Succeeded,
    Failed {
        message: String,
        instruction: CompletionInstruction,
    },
    /// Cancelled before it finished, e.g. by a forced shutdown.
    Abandoned,
}

impl ExecutionOutcome {
    /// Failure that leaves the schedule untouched.
    pub fn failed(message: impl Into<String>) -> Self {
        ExecutionOutcome::Failed {
            message: message.into(),
            instruction: CompletionInstruction::Noop,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Succeeded)
    }
}

impl From<Result<(), JobExecutionError>> for ExecutionOutcome {
    fn from(result: Result<(), JobExecutionError>) -> Self {
        match result {
            Ok(()) => ExecutionOutcome::Succeeded,
            Err(e) => ExecutionOutcome::Failed {
                message: e.message,
                instruction: e.instruction,
            },
        }
    }
}

/// One fire event, from the moment its trigger fired until its
/// [`ExecutionOutcome`] has been written back to the store.
#[derive(Debug, Clone)]
pub struct FiredJobContext {
    /// Store-assigned id of this execution.
    pub fire_id: u64,
    pub job: JobDefinition,
    pub trigger_key: TriggerKey,
    pub scheduled_fire_time: DateTime<Utc>,
    pub fire_time: DateTime<Utc>,
    pub previous_fire_time: Option<DateTime<Utc>>,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub times_triggered: u64,
}

impl FiredJobContext {
    /// Context handed to the job logic.
    pub fn execution_context(&self, cancellation: CancellationToken) -> JobExecutionContext {
        JobExecutionContext::new(
            self.job.key.clone(),
            self.trigger_key.clone(),
            self.scheduled_fire_time,
            self.fire_time,
        )
        .with_description(self.job.description.clone())
        .with_fire_times(
            self.previous_fire_time,
            self.next_fire_time,
            self.times_triggered,
        )
        .with_cancellation(cancellation)
    }
}
