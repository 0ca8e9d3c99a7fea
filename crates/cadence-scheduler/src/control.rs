//! Query and control operations on a [`Scheduler`].

use std::time::Duration;

use cadence_protocols::{
    DEFAULT_GROUP, JobClassInfo, JobKey, SchedulerError, SchedulerResult, TriggerKey,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::job::JobDefinition;
use crate::scheduler::Scheduler;
use crate::trigger::{RepeatCount, ScheduleVariant, Trigger, TriggerState};

/// Acknowledgement of a successful control operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAck {
    pub message: String,
}

impl JobAck {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A job's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub name: String,
    pub group: String,
}

/// One (job, trigger) pair with the trigger's schedule and state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobWithTriggerInfo {
    pub job_key: String,
    pub group: String,
    pub description: Option<String>,
    pub trigger_key: String,
    pub trigger_group: String,
    pub next_fire_time: Option<DateTime<Utc>>,
    pub previous_fire_time: Option<DateTime<Utc>>,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub trigger_state: TriggerState,
    pub repeat_interval: Option<Duration>,
    pub cron_expression: Option<String>,
    pub times_triggered: u64,
    pub last_error: Option<String>,
}

impl JobWithTriggerInfo {
    fn new(job: &JobDefinition, trigger: &Trigger) -> Self {
        Self {
            job_key: job.key.name.clone(),
            group: job.key.group.clone(),
            description: job.description.clone(),
            trigger_key: trigger.key.name.clone(),
            trigger_group: trigger.key.group.clone(),
            next_fire_time: trigger.next_fire_time,
            previous_fire_time: trigger.previous_fire_time,
            start_at: trigger.start_time,
            end_at: trigger.end_time,
            trigger_state: trigger.state,
            repeat_interval: trigger.schedule.repeat_interval(),
            cron_expression: trigger.schedule.cron_expression().map(str::to_string),
            times_triggered: trigger.times_triggered,
            last_error: trigger.last_error.clone(),
        }
    }
}

/// Job half of [`Scheduler::schedule_job`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    pub key: JobKey,
    /// Registered job class identifier.
    pub job_class: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl JobSpec {
    pub fn new(key: JobKey, job_class: impl Into<String>) -> Self {
        Self {
            key,
            job_class: job_class.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Trigger half of [`Scheduler::schedule_job`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub key: TriggerKey,
    pub schedule: ScheduleVariant,
    /// Defaults to now.
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
}

impl TriggerSpec {
    pub fn new(key: TriggerKey, schedule: ScheduleVariant) -> Self {
        Self {
            key,
            schedule,
            start_at: None,
            end_at: None,
        }
    }

    pub fn starting_at(mut self, start_at: DateTime<Utc>) -> Self {
        self.start_at = Some(start_at);
        self
    }

    pub fn ending_at(mut self, end_at: DateTime<Utc>) -> Self {
        self.end_at = Some(end_at);
        self
    }
}

/// Name of the trigger [`Scheduler::create_job`] creates for a job.
pub fn default_trigger_name(job_name: &str) -> String {
    format!("{}-trigger", job_name)
}

/// `now + interval_seconds`, the first fire of an interval job.
pub(crate) fn first_interval_fire(
    now: DateTime<Utc>,
    interval_seconds: i64,
) -> SchedulerResult<DateTime<Utc>> {
    if interval_seconds <= 0 {
        return Err(SchedulerError::Validation(
            "Interval must be greater than 0 seconds".to_string(),
        ));
    }
    TimeDelta::try_seconds(interval_seconds)
        .and_then(|interval| now.checked_add_signed(interval))
        .ok_or_else(|| SchedulerError::Validation("Interval is too large".to_string()))
}

impl Scheduler {
    /// Create a job in the default group that fires every `interval_seconds`,
    /// forever, starting one interval from now.
    pub async fn create_job(
        &self,
        name: &str,
        job_class: &str,
        interval_seconds: i64,
    ) -> SchedulerResult<JobAck> {
        let start_at = first_interval_fire(self.clock.now(), interval_seconds)?;
        let interval = Duration::from_secs(interval_seconds.unsigned_abs());

        let job = JobSpec::new(JobKey::named(name), job_class);
        let trigger = TriggerSpec::new(
            TriggerKey::named(default_trigger_name(name)),
            ScheduleVariant::Simple {
                interval,
                repeat: RepeatCount::Forever,
            },
        )
        .starting_at(start_at);

        self.schedule_job(job, trigger).await
    }

    /// Create a job in the default group driven by a cron expression.
    pub async fn create_cron_job(
        &self,
        name: &str,
        job_class: &str,
        expression: &str,
    ) -> SchedulerResult<JobAck> {
        let job = JobSpec::new(JobKey::named(name), job_class);
        let trigger = TriggerSpec::new(
            TriggerKey::named(default_trigger_name(name)),
            ScheduleVariant::cron(expression),
        );

        self.schedule_job(job, trigger).await
    }

    /// Create a job and its trigger.
    pub async fn schedule_job(&self, job: JobSpec, trigger: TriggerSpec) -> SchedulerResult<JobAck> {
        self.ensure_accepting()?;

        let factory = self
            .registry
            .resolve(&job.job_class)
            .ok_or_else(|| SchedulerError::Validation("Invalid job class".to_string()))?;

        let definition = JobDefinition::new(job.key.clone(), job.job_class)
            .with_description(job.description.or_else(|| factory.description()))
            .with_concurrency(factory.concurrency_policy());
        let trigger = Trigger::new(
            trigger.key,
            job.key.clone(),
            trigger.schedule,
            trigger.start_at.unwrap_or_else(|| self.clock.now()),
        )
        .with_end_time(trigger.end_at);

        self.store.store_job(definition, trigger).await?;
        info!("Job {} created", job.key);
        Ok(JobAck::new(format!("Job {} created successfully", job.key.name)))
    }

    /// Delete a job in the default group.
    pub async fn delete_job(&self, name: &str) -> SchedulerResult<JobAck> {
        self.delete_job_by_key(&JobKey::named(name)).await
    }

    /// Delete a job and all its triggers. Running executions finish, but
    /// their outcomes are discarded.
    pub async fn delete_job_by_key(&self, key: &JobKey) -> SchedulerResult<JobAck> {
        self.ensure_accepting()?;
        self.store.remove_job(key).await?;
        info!("Job {} deleted", key);
        Ok(JobAck::new(format!("Job {} deleted successfully", key.name)))
    }

    /// Pause a job in the default group.
    pub async fn pause_job(&self, name: &str) -> SchedulerResult<JobAck> {
        self.pause_job_by_key(&JobKey::named(name)).await
    }

    pub async fn pause_job_by_key(&self, key: &JobKey) -> SchedulerResult<JobAck> {
        self.ensure_accepting()?;
        self.store.pause_job(key).await?;
        info!("Job {} paused", key);
        Ok(JobAck::new(format!("Job {} paused successfully", key.name)))
    }

    /// Resume a job in the default group.
    pub async fn resume_job(&self, name: &str) -> SchedulerResult<JobAck> {
        self.resume_job_by_key(&JobKey::named(name)).await
    }

    pub async fn resume_job_by_key(&self, key: &JobKey) -> SchedulerResult<JobAck> {
        self.ensure_accepting()?;
        self.store.resume_job(key, self.clock.now()).await?;
        info!("Job {} resumed", key);
        Ok(JobAck::new(format!("Job {} resumed successfully", key.name)))
    }

    /// All jobs, sorted by group then name.
    pub async fn list_jobs(&self) -> Vec<JobSummary> {
        self.store
            .job_keys()
            .await
            .into_iter()
            .map(|key| JobSummary {
                name: key.name,
                group: key.group,
            })
            .collect()
    }

    /// One row per (job, trigger) pair. Jobs without triggers are omitted.
    pub async fn list_jobs_with_trigger_info(&self) -> Vec<JobWithTriggerInfo> {
        self.store
            .jobs_with_triggers()
            .await
            .iter()
            .flat_map(|(job, triggers)| {
                triggers
                    .iter()
                    .map(move |trigger| JobWithTriggerInfo::new(job, trigger))
            })
            .collect()
    }

    /// Trigger rows of one job.
    pub async fn get_job_with_trigger_info(
        &self,
        name: &str,
        group: &str,
    ) -> SchedulerResult<Vec<JobWithTriggerInfo>> {
        let (job, triggers) = self
            .store
            .job_with_triggers(&JobKey::new(name, group))
            .await
            .ok_or_else(|| SchedulerError::NotFound("Job not found".to_string()))?;

        Ok(triggers
            .iter()
            .map(|trigger| JobWithTriggerInfo::new(&job, trigger))
            .collect())
    }

    pub async fn get_trigger_state(
        &self,
        trigger_name: &str,
        group: &str,
    ) -> SchedulerResult<TriggerState> {
        self.store
            .trigger_state(&TriggerKey::new(trigger_name, group))
            .await
    }

    /// Registered job classes, sorted by identifier.
    pub fn list_available_job_classes(&self) -> Vec<JobClassInfo> {
        self.registry.list()
    }

    /// Whether a job exists in the default group.
    pub async fn job_exists(&self, name: &str) -> bool {
        self.store.check_exists(&JobKey::new(name, DEFAULT_GROUP)).await
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
