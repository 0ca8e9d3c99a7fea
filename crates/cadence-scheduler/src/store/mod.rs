//! Job store: jobs, their triggers, and trigger state transitions.
//!
//! All state lives behind one `tokio::sync::RwLock`. Reads take the read
//! lock and return snapshots. Every mutation takes the write lock, persists
//! through the [`StoreBackend`] before releasing it, and rolls the in-memory
//! change back if persisting fails. Acquisition of a due trigger is a state
//! transition under that write lock, so no trigger is ever acquired twice.

mod backend;

pub use backend::{FileBackend, MemoryBackend, StoreBackend, StoreSnapshot, backend_from_config};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use cadence_config::MisfirePolicy;
use cadence_core::JobClassRegistry;
use cadence_protocols::{CompletionInstruction, JobKey, SchedulerError, SchedulerResult, TriggerKey};
use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::fired::{ExecutionOutcome, FiredJobContext};
use crate::job::JobDefinition;
use crate::metrics::SchedulerMetrics;
use crate::trigger::{Trigger, TriggerState};

/// Reason the scheduler loop was woken.
#[derive(Debug, Clone)]
pub enum WakeupSignal {
    /// Jobs or triggers changed.
    StoreChanged { reason: &'static str },
}

/// Misfire handling applied on acquisition and resume.
#[derive(Debug, Clone, Copy)]
pub struct MisfireSettings {
    pub policy: MisfirePolicy,
    pub threshold: Duration,
}

impl Default for MisfireSettings {
    fn default() -> Self {
        Self {
            policy: MisfirePolicy::FireOnceNow,
            threshold: Duration::from_secs(60),
        }
    }
}

/// What happened to an execution outcome handed to [`JobStore::complete_execution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Recorded,
    /// The job was deleted while executing.
    Discarded,
}

#[derive(Debug, Clone)]
struct Execution {
    job_key: JobKey,
    exclusive: bool,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    jobs: BTreeMap<JobKey, JobDefinition>,
    triggers: BTreeMap<TriggerKey, Trigger>,
    paused_jobs: HashSet<JobKey>,
    executing: HashMap<u64, Execution>,
    next_fire_id: u64,
}

impl StoreState {
    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            jobs: self.jobs.values().cloned().collect(),
            triggers: self.triggers.values().cloned().collect(),
            paused_jobs: self.paused_jobs.iter().cloned().collect(),
        }
    }

    fn trigger_keys_of(&self, job_key: &JobKey) -> Vec<TriggerKey> {
        self.triggers
            .values()
            .filter(|t| &t.job_key == job_key)
            .map(|t| t.key.clone())
            .collect()
    }

    /// Whether any fireable trigger is due at `now`. Misfired triggers are
    /// due too, so an acquisition pass changes nothing otherwise.
    fn has_due(&self, now: DateTime<Utc>) -> bool {
        self.triggers
            .values()
            .any(|t| t.state.is_fireable() && t.next_fire_time.is_some_and(|next| next <= now))
    }

    fn triggers_of(&self, job_key: &JobKey) -> Vec<Trigger> {
        self.triggers
            .values()
            .filter(|t| &t.job_key == job_key)
            .cloned()
            .collect()
    }

    fn is_executing_exclusively(&self, job_key: &JobKey) -> bool {
        self.executing
            .values()
            .any(|e| e.exclusive && &e.job_key == job_key)
    }

    fn remove_job(&mut self, job_key: &JobKey) -> Option<JobDefinition> {
        let job = self.jobs.remove(job_key)?;
        self.triggers.retain(|_, t| &t.job_key != job_key);
        self.paused_jobs.remove(job_key);
        // In-flight executions keep running; their outcomes are discarded.
        self.executing.retain(|_, e| &e.job_key != job_key);
        Some(job)
    }

    fn set_job_triggers(&mut self, job_key: &JobKey, from: &[TriggerState], to: TriggerState) {
        for trigger in self.triggers.values_mut() {
            if &trigger.job_key == job_key && from.contains(&trigger.state) {
                trigger.state = to;
            }
        }
    }
}

/// Transactional store of jobs and triggers.
pub struct JobStore {
    state: RwLock<StoreState>,
    backend: Arc<dyn StoreBackend>,
    misfire: MisfireSettings,
    metrics: Arc<SchedulerMetrics>,
    wakeup_tx: mpsc::Sender<WakeupSignal>,
}

impl JobStore {
    /// Create an empty store.
    pub fn new(
        backend: Arc<dyn StoreBackend>,
        misfire: MisfireSettings,
        metrics: Arc<SchedulerMetrics>,
        wakeup_tx: mpsc::Sender<WakeupSignal>,
    ) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            backend,
            misfire,
            metrics,
            wakeup_tx,
        }
    }

    /// Create a store and recover whatever the backend persisted.
    ///
    /// Triggers left `Acquired` or `Blocked` by a previous run go back to
    /// `Waiting`. Jobs whose class is no longer registered are skipped.
    pub async fn open(
        backend: Arc<dyn StoreBackend>,
        misfire: MisfireSettings,
        metrics: Arc<SchedulerMetrics>,
        wakeup_tx: mpsc::Sender<WakeupSignal>,
        registry: &JobClassRegistry,
    ) -> SchedulerResult<Self> {
        let store = Self::new(backend, misfire, metrics, wakeup_tx);
        let Some(snapshot) = store.backend.load().await? else {
            return Ok(store);
        };

        let mut state = store.state.write().await;
        for job in snapshot.jobs {
            if !registry.contains(&job.job_class) {
                warn!(
                    "Skipping persisted job {}: job class {} is not registered",
                    job.key, job.job_class
                );
                continue;
            }
            state.jobs.insert(job.key.clone(), job);
        }
        for mut trigger in snapshot.triggers {
            if !state.jobs.contains_key(&trigger.job_key) {
                continue;
            }
            if matches!(trigger.state, TriggerState::Acquired | TriggerState::Blocked) {
                trigger.state = TriggerState::Waiting;
            }
            state.triggers.insert(trigger.key.clone(), trigger);
        }
        let paused: HashSet<JobKey> = snapshot
            .paused_jobs
            .into_iter()
            .filter(|k| state.jobs.contains_key(k))
            .collect();
        state.paused_jobs = paused;

        info!(
            "Recovered {} jobs and {} triggers from store",
            state.jobs.len(),
            state.triggers.len()
        );
        drop(state);
        Ok(store)
    }

    /// Run `f` under the write lock, persist, and roll back on any error.
    async fn mutate<R>(
        &self,
        reason: Option<&'static str>,
        f: impl FnOnce(&mut StoreState) -> SchedulerResult<R>,
    ) -> SchedulerResult<R> {
        let mut state = self.state.write().await;
        let backup = state.clone();

        let result = match f(&mut *state) {
            Ok(result) => result,
            Err(e) => {
                *state = backup;
                return Err(e);
            }
        };

        if self.backend.is_durable() {
            if let Err(e) = self.backend.persist(&state.snapshot()).await {
                warn!("Store persistence failed, rolling back: {}", e);
                *state = backup;
                return Err(e);
            }
        }
        drop(state);

        if let Some(reason) = reason {
            self.wake(reason);
        }
        Ok(result)
    }

    fn wake(&self, reason: &'static str) {
        // A full channel already guarantees a pending wakeup.
        let _ = self
            .wakeup_tx
            .try_send(WakeupSignal::StoreChanged { reason });
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Add a job together with its first trigger.
    pub async fn store_job(&self, job: JobDefinition, mut trigger: Trigger) -> SchedulerResult<()> {
        job.key.validate()?;
        trigger.validate()?;
        if trigger.job_key != job.key {
            return Err(SchedulerError::Validation(format!(
                "Trigger {} does not belong to job {}",
                trigger.key, job.key
            )));
        }
        trigger.state = TriggerState::Waiting;
        trigger.next_fire_time = trigger.first_fire_time();
        if trigger.next_fire_time.is_none() {
            return Err(SchedulerError::Validation(format!(
                "Trigger {} will never fire",
                trigger.key
            )));
        }

        let job_key = job.key.clone();
        self.mutate(Some("job stored"), move |state| {
            if state.jobs.contains_key(&job.key) {
                return Err(SchedulerError::Conflict("Job already exists".to_string()));
            }
            if state.triggers.contains_key(&trigger.key) {
                return Err(SchedulerError::Conflict("Trigger already exists".to_string()));
            }
            state.triggers.insert(trigger.key.clone(), trigger);
            state.jobs.insert(job.key.clone(), job);
            Ok(())
        })
        .await?;

        debug!("Stored job {}", job_key);
        Ok(())
    }

    /// Bind another trigger to an existing job.
    pub async fn add_trigger(&self, mut trigger: Trigger) -> SchedulerResult<()> {
        trigger.validate()?;
        trigger.next_fire_time = trigger.first_fire_time();
        if trigger.next_fire_time.is_none() {
            return Err(SchedulerError::Validation(format!(
                "Trigger {} will never fire",
                trigger.key
            )));
        }

        self.mutate(Some("trigger added"), move |state| {
            if !state.jobs.contains_key(&trigger.job_key) {
                return Err(SchedulerError::NotFound("Job not found".to_string()));
            }
            if state.triggers.contains_key(&trigger.key) {
                return Err(SchedulerError::Conflict("Trigger already exists".to_string()));
            }
            trigger.state = if state.paused_jobs.contains(&trigger.job_key) {
                TriggerState::Paused
            } else if state.is_executing_exclusively(&trigger.job_key) {
                TriggerState::Blocked
            } else {
                TriggerState::Waiting
            };
            state.triggers.insert(trigger.key.clone(), trigger);
            Ok(())
        })
        .await
    }

    /// Unbind a trigger. The job itself is kept.
    pub async fn remove_trigger(&self, key: &TriggerKey) -> SchedulerResult<()> {
        self.mutate(Some("trigger removed"), |state| {
            state
                .triggers
                .remove(key)
                .map(|_| ())
                .ok_or_else(|| SchedulerError::NotFound("Trigger not found".to_string()))
        })
        .await
    }

    /// Remove a job and all its triggers.
    ///
    /// Executions already running finish, but their outcomes are discarded.
    pub async fn remove_job(&self, key: &JobKey) -> SchedulerResult<()> {
        self.mutate(Some("job removed"), |state| {
            state
                .remove_job(key)
                .map(|_| ())
                .ok_or_else(|| SchedulerError::NotFound("Job not found".to_string()))
        })
        .await?;

        debug!("Removed job {}", key);
        Ok(())
    }

    /// Pause every trigger of a job, keeping their next fire times.
    pub async fn pause_job(&self, key: &JobKey) -> SchedulerResult<()> {
        self.mutate(Some("job paused"), |state| {
            if !state.jobs.contains_key(key) {
                return Err(SchedulerError::NotFound("Job not found".to_string()));
            }
            state.paused_jobs.insert(key.clone());
            state.set_job_triggers(
                key,
                &[
                    TriggerState::Waiting,
                    TriggerState::Blocked,
                    TriggerState::Error,
                    TriggerState::Acquired,
                ],
                TriggerState::Paused,
            );
            Ok(())
        })
        .await
    }

    /// Resume a paused job.
    ///
    /// Triggers whose preserved next fire time went stale while paused get
    /// misfire handling. Triggers of a job still executing exclusively come
    /// back `Blocked`, triggers whose last execution failed come back `Error`.
    pub async fn resume_job(&self, key: &JobKey, now: DateTime<Utc>) -> SchedulerResult<()> {
        let misfire = self.misfire;
        let misfired = self
            .mutate(Some("job resumed"), |state| {
                if !state.jobs.contains_key(key) {
                    return Err(SchedulerError::NotFound("Job not found".to_string()));
                }
                state.paused_jobs.remove(key);
                let blocked = state.is_executing_exclusively(key);

                let mut misfired = 0;
                for trigger in state.triggers.values_mut() {
                    if &trigger.job_key != key || trigger.state != TriggerState::Paused {
                        continue;
                    }
                    // `last_error` is only set while the latest outcome is a failure.
                    trigger.state = if blocked {
                        TriggerState::Blocked
                    } else if trigger.last_error.is_some() {
                        TriggerState::Error
                    } else {
                        TriggerState::Waiting
                    };
                    if trigger.is_misfired(now, misfire.threshold) {
                        trigger.apply_misfire(now, misfire.policy);
                        misfired += 1;
                    }
                }
                Ok(misfired)
            })
            .await?;

        self.metrics.record_misfired(misfired);
        Ok(())
    }

    /// Claim the earliest trigger due at `now`, applying misfire handling to
    /// every fireable trigger first.
    pub async fn acquire_next_due(&self, now: DateTime<Utc>) -> SchedulerResult<Option<Trigger>> {
        let misfire = self.misfire;
        if !self.state.read().await.has_due(now) {
            return Ok(None);
        }
        let (acquired, misfired) = self
            .mutate(None, |state| {
                let mut misfired = 0;
                for trigger in state.triggers.values_mut() {
                    if trigger.state.is_fireable() && trigger.is_misfired(now, misfire.threshold) {
                        debug!("Trigger {} misfired", trigger.key);
                        trigger.apply_misfire(now, misfire.policy);
                        misfired += 1;
                    }
                }

                let due = state
                    .triggers
                    .values_mut()
                    .filter(|t| t.state.is_fireable())
                    .filter_map(|t| t.next_fire_time.filter(|next| *next <= now).map(|next| (next, t)))
                    .min_by(|(a, ta), (b, tb)| a.cmp(b).then_with(|| ta.key.cmp(&tb.key)))
                    .map(|(_, t)| t);

                let acquired = due.map(|trigger| {
                    trigger.state = TriggerState::Acquired;
                    trigger.clone()
                });
                Ok((acquired, misfired))
            })
            .await?;

        self.metrics.record_misfired(misfired);
        Ok(acquired)
    }

    /// Release a trigger acquired but never fired.
    pub async fn release_acquired(&self, key: &TriggerKey) -> SchedulerResult<()> {
        self.mutate(Some("trigger released"), |state| {
            if let Some(trigger) = state.triggers.get_mut(key) {
                if trigger.state == TriggerState::Acquired {
                    trigger.state = TriggerState::Waiting;
                }
            }
            Ok(())
        })
        .await
    }

    /// Fire an acquired trigger.
    ///
    /// Returns `None` if the trigger was paused or removed since acquisition.
    /// For jobs that disallow concurrent execution, every other trigger of
    /// the job becomes `Blocked` until [`JobStore::complete_execution`].
    pub async fn trigger_fired(
        &self,
        key: &TriggerKey,
        now: DateTime<Utc>,
    ) -> SchedulerResult<Option<FiredJobContext>> {
        self.mutate(None, |state| {
            let Some(trigger) = state.triggers.get(key) else {
                return Ok(None);
            };
            if trigger.state != TriggerState::Acquired {
                return Ok(None);
            }
            let Some(scheduled) = trigger.next_fire_time else {
                return Ok(None);
            };
            let Some(job) = state.jobs.get(&trigger.job_key).cloned() else {
                return Ok(None);
            };

            let fire_id = state.next_fire_id;
            state.next_fire_id += 1;

            let trigger = match state.triggers.get_mut(key) {
                Some(trigger) => trigger,
                None => return Ok(None),
            };
            trigger.triggered(scheduled);
            trigger.state = if trigger.next_fire_time.is_some() {
                TriggerState::Waiting
            } else {
                TriggerState::Complete
            };

            let fired = FiredJobContext {
                fire_id,
                job: job.clone(),
                trigger_key: key.clone(),
                scheduled_fire_time: scheduled,
                fire_time: now,
                previous_fire_time: trigger.previous_fire_time,
                next_fire_time: trigger.next_fire_time,
                times_triggered: trigger.times_triggered,
            };

            if job.is_exclusive() {
                state.set_job_triggers(
                    &job.key,
                    &[TriggerState::Waiting, TriggerState::Error],
                    TriggerState::Blocked,
                );
            }
            state.executing.insert(
                fire_id,
                Execution {
                    job_key: job.key.clone(),
                    exclusive: job.is_exclusive(),
                },
            );
            Ok(Some(fired))
        })
        .await
    }

    /// Write an execution outcome back.
    ///
    /// Unblocks the job's triggers, records failures on the firing trigger,
    /// and carries out the failure's completion instruction.
    pub async fn complete_execution(
        &self,
        fired: &FiredJobContext,
        outcome: &ExecutionOutcome,
    ) -> SchedulerResult<CompletionStatus> {
        self.mutate(Some("execution completed"), |state| {
            let Some(execution) = state.executing.remove(&fired.fire_id) else {
                return Ok(CompletionStatus::Discarded);
            };

            if execution.exclusive && !state.is_executing_exclusively(&execution.job_key) {
                state.set_job_triggers(
                    &execution.job_key,
                    &[TriggerState::Blocked],
                    TriggerState::Waiting,
                );
            }

            let ExecutionOutcome::Failed {
                message,
                instruction,
            } = outcome
            else {
                if outcome.is_success() {
                    if let Some(trigger) = state.triggers.get_mut(&fired.trigger_key) {
                        trigger.last_error = None;
                        if trigger.state == TriggerState::Error {
                            trigger.state = TriggerState::Waiting;
                        }
                    }
                }
                return Ok(CompletionStatus::Recorded);
            };

            if let Some(trigger) = state.triggers.get_mut(&fired.trigger_key) {
                trigger.last_error = Some(message.clone());
                if trigger.state == TriggerState::Waiting {
                    trigger.state = TriggerState::Error;
                }
            }

            match instruction {
                CompletionInstruction::Noop => {}
                CompletionInstruction::DeleteTrigger => {
                    state.triggers.remove(&fired.trigger_key);
                }
                CompletionInstruction::DeleteJob => {
                    state.remove_job(&execution.job_key);
                }
            }
            Ok(CompletionStatus::Recorded)
        })
        .await
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// All job keys, sorted.
    pub async fn job_keys(&self) -> Vec<JobKey> {
        self.state.read().await.jobs.keys().cloned().collect()
    }

    pub async fn job(&self, key: &JobKey) -> Option<JobDefinition> {
        self.state.read().await.jobs.get(key).cloned()
    }

    /// Triggers bound to a job, sorted by key.
    pub async fn triggers_of_job(&self, key: &JobKey) -> Vec<Trigger> {
        self.state.read().await.triggers_of(key)
    }

    /// A job and its triggers, read under one lock.
    pub async fn job_with_triggers(&self, key: &JobKey) -> Option<(JobDefinition, Vec<Trigger>)> {
        let state = self.state.read().await;
        let job = state.jobs.get(key)?.clone();
        Some((job, state.triggers_of(key)))
    }

    /// Every job with its triggers, read under one lock and sorted by job key.
    pub async fn jobs_with_triggers(&self) -> Vec<(JobDefinition, Vec<Trigger>)> {
        let state = self.state.read().await;
        state
            .jobs
            .values()
            .map(|job| (job.clone(), state.triggers_of(&job.key)))
            .collect()
    }

    pub async fn trigger(&self, key: &TriggerKey) -> Option<Trigger> {
        self.state.read().await.triggers.get(key).cloned()
    }

    pub async fn trigger_state(&self, key: &TriggerKey) -> SchedulerResult<TriggerState> {
        self.state
            .read()
            .await
            .triggers
            .get(key)
            .map(|t| t.state)
            .ok_or_else(|| SchedulerError::NotFound("Trigger not found".to_string()))
    }

    pub async fn check_exists(&self, key: &JobKey) -> bool {
        self.state.read().await.jobs.contains_key(key)
    }

    pub async fn trigger_exists(&self, key: &TriggerKey) -> bool {
        self.state.read().await.triggers.contains_key(key)
    }

    pub async fn is_job_paused(&self, key: &JobKey) -> bool {
        self.state.read().await.paused_jobs.contains(key)
    }

    /// Earliest next fire time among fireable triggers.
    pub async fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .await
            .triggers
            .values()
            .filter(|t| t.state.is_fireable())
            .filter_map(|t| t.next_fire_time)
            .min()
    }

    /// Number of executions whose outcome has not been written back yet.
    pub async fn executing_count(&self) -> usize {
        self.state.read().await.executing.len()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.jobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.jobs.is_empty()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
