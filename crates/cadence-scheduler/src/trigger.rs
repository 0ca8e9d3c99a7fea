//! Triggers and next-fire-time computation.
//!
//! All computations here are pure functions of the trigger's own fields and
//! the `now` passed in by the caller.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use cadence_config::MisfirePolicy;
use cadence_protocols::{JobKey, SchedulerError, SchedulerResult, TriggerKey};
use chrono::{DateTime, TimeDelta, Utc};
use cron::Schedule;
use serde::{Deserialize, Serialize};

/// How many times a simple trigger repeats after its first fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatCount {
    /// `n` repeats after the first fire, so `n + 1` fires in total.
    Count(u32),
    Forever,
}

/// When a trigger fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleVariant {
    /// Fixed interval, anchored on the previous fire.
    Simple {
        interval: Duration,
        repeat: RepeatCount,
    },
    /// Six-field cron expression (`sec min hour dom month dow`), evaluated in UTC.
    Cron { expression: String },
}

impl ScheduleVariant {
    pub fn every(interval: Duration) -> Self {
        ScheduleVariant::Simple {
            interval,
            repeat: RepeatCount::Forever,
        }
    }

    pub fn cron(expression: impl Into<String>) -> Self {
        ScheduleVariant::Cron {
            expression: expression.into(),
        }
    }

    pub fn repeat_interval(&self) -> Option<Duration> {
        match self {
            ScheduleVariant::Simple { interval, .. } => Some(*interval),
            ScheduleVariant::Cron { .. } => None,
        }
    }

    pub fn cron_expression(&self) -> Option<&str> {
        match self {
            ScheduleVariant::Simple { .. } => None,
            ScheduleVariant::Cron { expression } => Some(expression),
        }
    }
}

/// Lifecycle state of a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerState {
    /// Waiting for its next fire time.
    Waiting,
    Paused,
    /// Claimed by the scheduler loop, about to fire.
    Acquired,
    /// Schedule exhausted.
    Complete,
    /// Last execution failed. Still fireable.
    Error,
    /// Its job is executing and does not allow concurrent executions.
    Blocked,
}

impl TriggerState {
    /// Whether the scheduler loop may acquire a trigger in this state.
    pub fn is_fireable(&self) -> bool {
        matches!(self, TriggerState::Waiting | TriggerState::Error)
    }
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerState::Waiting => write!(f, "waiting"),
            TriggerState::Paused => write!(f, "paused"),
            TriggerState::Acquired => write!(f, "acquired"),
            TriggerState::Complete => write!(f, "complete"),
            TriggerState::Error => write!(f, "error"),
            TriggerState::Blocked => write!(f, "blocked"),
        }
    }
}

/// A schedule bound to one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub key: TriggerKey,
    pub job_key: JobKey,
    pub schedule: ScheduleVariant,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub state: TriggerState,
    #[serde(default)]
    pub previous_fire_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_fire_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub times_triggered: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl Trigger {
    pub fn new(
        key: TriggerKey,
        job_key: JobKey,
        schedule: ScheduleVariant,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            job_key,
            schedule,
            start_time,
            end_time: None,
            state: TriggerState::Waiting,
            previous_fire_time: None,
            next_fire_time: None,
            times_triggered: 0,
            last_error: None,
        }
    }

    pub fn with_end_time(mut self, end_time: Option<DateTime<Utc>>) -> Self {
        self.end_time = end_time;
        self
    }

    /// Check the trigger's identity and schedule.
    pub fn validate(&self) -> SchedulerResult<()> {
        self.key.validate()?;
        match &self.schedule {
            ScheduleVariant::Simple { interval, .. } => {
                interval_delta(*interval)?;
            }
            ScheduleVariant::Cron { expression } => {
                parse_cron(expression)?;
            }
        }
        if let Some(end) = self.end_time {
            if end < self.start_time {
                return Err(SchedulerError::Validation(
                    "End time must not precede start time".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// First fire time: the start time for simple triggers, the earliest
    /// cron match at or after it otherwise.
    pub fn first_fire_time(&self) -> Option<DateTime<Utc>> {
        let first = match &self.schedule {
            ScheduleVariant::Simple { .. } => Some(self.start_time),
            ScheduleVariant::Cron { expression } => {
                let schedule = parse_cron(expression).ok()?;
                // `after` is exclusive and works at whole-second resolution.
                let before = self
                    .start_time
                    .checked_sub_signed(TimeDelta::milliseconds(1))?;
                schedule.after(&before).find(|t| *t >= self.start_time)
            }
        };
        first.filter(|t| self.within_end(*t))
    }

    /// Earliest scheduled fire time strictly after `after`, or `None` once the
    /// schedule is exhausted or past its end time.
    pub fn fire_time_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let next = match &self.schedule {
            ScheduleVariant::Simple { interval, repeat } => {
                if let RepeatCount::Count(n) = repeat {
                    if self.times_triggered > u64::from(*n) {
                        return None;
                    }
                }
                let step = interval_delta(*interval).ok()?;
                let anchor = self.previous_fire_time.unwrap_or(self.start_time);
                next_grid_slot(anchor, step, after)?
            }
            ScheduleVariant::Cron { expression } => {
                parse_cron(expression).ok()?.after(&after).next()?
            }
        };
        Some(next).filter(|t| self.within_end(*t))
    }

    /// Record a fire at `fire_time` and recompute the next one.
    pub fn triggered(&mut self, fire_time: DateTime<Utc>) {
        self.previous_fire_time = Some(fire_time);
        self.times_triggered += 1;
        self.next_fire_time = self.fire_time_after(fire_time);
    }

    /// Whether the next fire time is older than `now - threshold`.
    pub fn is_misfired(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        let threshold = TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX);
        match (self.next_fire_time, now.checked_sub_signed(threshold)) {
            (Some(next), Some(cutoff)) => next < cutoff,
            _ => false,
        }
    }

    /// Move a misfired trigger's next fire time according to `policy`.
    ///
    /// A trigger whose schedule has no slot left after `now` becomes
    /// `Complete`.
    pub fn apply_misfire(&mut self, now: DateTime<Utc>, policy: MisfirePolicy) {
        self.next_fire_time = match policy {
            MisfirePolicy::FireOnceNow => Some(now).filter(|t| self.within_end(*t)),
            MisfirePolicy::RescheduleNext => self.fire_time_after(now),
        };
        if self.next_fire_time.is_none() {
            self.state = TriggerState::Complete;
        }
    }

    fn within_end(&self, t: DateTime<Utc>) -> bool {
        self.end_time.is_none_or(|end| t <= end)
    }
}

/// Earliest `anchor + k * step` (k >= 0) strictly after `after`.
fn next_grid_slot(
    anchor: DateTime<Utc>,
    step: TimeDelta,
    after: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if anchor > after {
        return Some(anchor);
    }
    let step_ns = step.num_nanoseconds()?;
    let elapsed_ns = (after - anchor).num_nanoseconds()?;
    let slots = elapsed_ns / step_ns + 1;
    anchor.checked_add_signed(TimeDelta::nanoseconds(slots.checked_mul(step_ns)?))
}

fn interval_delta(interval: Duration) -> SchedulerResult<TimeDelta> {
    if interval < Duration::from_millis(1) {
        return Err(SchedulerError::Validation(
            "Repeat interval must be at least 1 millisecond".to_string(),
        ));
    }
    TimeDelta::from_std(interval)
        .map_err(|_| SchedulerError::Validation("Repeat interval is too large".to_string()))
}

pub(crate) fn parse_cron(expression: &str) -> SchedulerResult<Schedule> {
    Schedule::from_str(expression).map_err(|e| {
        SchedulerError::Validation(format!("Invalid cron expression '{}': {}", expression, e))
    })
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
