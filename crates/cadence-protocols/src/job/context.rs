//! Context handed to job logic on each fire event.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::types::{JobKey, TriggerKey};

/// Read-only view of the fire event being executed.
#[derive(Debug, Clone)]
pub struct JobExecutionContext {
    pub job_key: JobKey,
    pub trigger_key: TriggerKey,
    pub description: Option<String>,
    /// The fire time the trigger was scheduled for.
    pub scheduled_fire_time: DateTime<Utc>,
    /// When the scheduler actually fired it.
    pub fire_time: DateTime<Utc>,
    pub previous_fire_time: Option<DateTime<Utc>>,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub times_triggered: u64,
    cancellation: CancellationToken,
}

impl JobExecutionContext {
    pub fn new(
        job_key: JobKey,
        trigger_key: TriggerKey,
        scheduled_fire_time: DateTime<Utc>,
        fire_time: DateTime<Utc>,
    ) -> Self {
        Self {
            job_key,
            trigger_key,
            description: None,
            scheduled_fire_time,
            fire_time,
            previous_fire_time: None,
            next_fire_time: None,
            times_triggered: 0,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_fire_times(
        mut self,
        previous: Option<DateTime<Utc>>,
        next: Option<DateTime<Utc>>,
        times_triggered: u64,
    ) -> Self {
        self.previous_fire_time = previous;
        self.next_fire_time = next;
        self.times_triggered = times_triggered;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Token cancelled when the scheduler shuts down without waiting for jobs.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
