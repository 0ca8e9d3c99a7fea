//! Execution dispatcher: runs job bodies on a bounded worker pool.

use std::sync::Arc;
use std::time::Duration;

use cadence_core::JobClassRegistry;
use cadence_protocols::{SchedulerError, SchedulerResult};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use crate::fired::{ExecutionOutcome, FiredJobContext};
use crate::metrics::SchedulerMetrics;
use crate::store::{CompletionStatus, JobStore};

/// A reserved worker. Dropping it frees the worker.
#[derive(Debug)]
pub struct ExecutionSlot {
    _permit: OwnedSemaphorePermit,
}

/// Bounded pool executing fired jobs.
pub struct Dispatcher {
    max_workers: usize,
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    registry: Arc<JobClassRegistry>,
    store: Arc<JobStore>,
    metrics: Arc<SchedulerMetrics>,
}

impl Dispatcher {
    pub fn new(
        max_workers: usize,
        registry: Arc<JobClassRegistry>,
        store: Arc<JobStore>,
        metrics: Arc<SchedulerMetrics>,
    ) -> Self {
        Self {
            max_workers,
            semaphore: Arc::new(Semaphore::new(max_workers)),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            registry,
            store,
            metrics,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Number of idle workers.
    pub fn available_workers(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Number of executions still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for a free worker.
    pub async fn reserve_slot(&self) -> SchedulerResult<ExecutionSlot> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SchedulerError::Shutdown)?;
        Ok(ExecutionSlot { _permit: permit })
    }

    /// Run one fire event on the reserved worker and write its outcome back.
    pub fn dispatch(&self, fired: FiredJobContext, slot: ExecutionSlot) {
        let registry = self.registry.clone();
        let store = self.store.clone();
        let metrics = self.metrics.clone();
        let cancel = self.cancel.child_token();

        self.tracker.spawn(async move {
            let outcome = execute(&registry, &fired, cancel).await;
            match &outcome {
                ExecutionOutcome::Succeeded => {
                    metrics.record_succeeded();
                    debug!("Job {} completed", fired.job.key);
                }
                ExecutionOutcome::Failed { message, .. } => {
                    metrics.record_failed();
                    error!("Job {} failed: {}", fired.job.key, message);
                }
                ExecutionOutcome::Abandoned => {
                    metrics.record_abandoned();
                    warn!("Job {} abandoned", fired.job.key);
                }
            }

            match store.complete_execution(&fired, &outcome).await {
                Ok(CompletionStatus::Recorded) => {}
                Ok(CompletionStatus::Discarded) => {
                    metrics.record_discarded();
                    debug!(
                        "Discarded outcome of job {}: job was deleted",
                        fired.job.key
                    );
                }
                Err(e) => {
                    error!("Failed to record outcome of job {}: {}", fired.job.key, e);
                }
            }
            drop(slot);
        });
    }

    /// Stop handing out workers and wait for running jobs.
    ///
    /// With `wait_for_jobs`, running jobs get up to `timeout` to finish before
    /// they are cancelled. Without it they are cancelled right away. Returns
    /// `true` if every job finished on its own.
    pub async fn drain(&self, wait_for_jobs: bool, timeout: Duration) -> bool {
        self.semaphore.close();
        self.tracker.close();

        let finished = wait_for_jobs
            && tokio::time::timeout(timeout, self.tracker.wait())
                .await
                .is_ok();
        if !finished {
            if wait_for_jobs {
                warn!("Shutdown timeout elapsed, cancelling {} running jobs", self.in_flight());
            }
            self.cancel.cancel();
            self.tracker.wait().await;
        }
        finished
    }
}

/// Run the job once, turning every way it can end into an outcome.
async fn execute(
    registry: &JobClassRegistry,
    fired: &FiredJobContext,
    cancel: CancellationToken,
) -> ExecutionOutcome {
    let Some(factory) = registry.resolve(&fired.job.job_class) else {
        return ExecutionOutcome::failed(format!(
            "Job class {} is not registered",
            fired.job.job_class
        ));
    };

    let job = factory.create();
    let ctx = fired.execution_context(cancel.clone());
    debug!(
        "Executing job {} (trigger {}, fire #{})",
        fired.job.key, fired.trigger_key, fired.times_triggered
    );

    let mut handle = tokio::spawn(async move { job.execute(&ctx).await });
    tokio::select! {
        result = &mut handle => match result {
            Ok(result) => ExecutionOutcome::from(result),
            Err(e) if e.is_panic() => ExecutionOutcome::failed("Job panicked"),
            Err(_) => ExecutionOutcome::Abandoned,
        },
        _ = cancel.cancelled() => {
            handle.abort();
            ExecutionOutcome::Abandoned
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobDefinition;
    use crate::store::{MemoryBackend, MisfireSettings};
    use crate::trigger::{ScheduleVariant, Trigger, TriggerState};
    use async_trait::async_trait;
    use cadence_protocols::{
        Job, JobClassInfo, JobExecutionContext, JobExecutionError, JobFactory, JobKey, TriggerKey,
    };
    use chrono::Utc;
    use tokio::sync::mpsc;

    struct SleepyJob(Duration);

    #[async_trait]
    impl Job for SleepyJob {
        async fn execute(&self, _ctx: &JobExecutionContext) -> Result<(), JobExecutionError> {
            tokio::time::sleep(self.0).await;
            Ok(())
        }
    }

    struct PanickyJob;

    #[async_trait]
    impl Job for PanickyJob {
        async fn execute(&self, _ctx: &JobExecutionContext) -> Result<(), JobExecutionError> {
            panic!("boom");
        }
    }

    struct Factory {
        info: JobClassInfo,
        make: fn() -> Arc<dyn Job>,
    }

    impl JobFactory for Factory {
        fn class_info(&self) -> &JobClassInfo {
            &self.info
        }

        fn create(&self) -> Arc<dyn Job> {
            (self.make)()
        }
    }

    struct Fixture {
        dispatcher: Dispatcher,
        store: Arc<JobStore>,
        metrics: Arc<SchedulerMetrics>,
    }

    fn fixture(max_workers: usize) -> Fixture {
        let registry = Arc::new(JobClassRegistry::new());
        registry
            .register(Arc::new(Factory {
                info: JobClassInfo::new("Sleepy", "tests::Sleepy"),
                make: || Arc::new(SleepyJob(Duration::from_secs(2))),
            }))
            .unwrap();
        registry
            .register(Arc::new(Factory {
                info: JobClassInfo::new("Panicky", "tests::Panicky"),
                make: || Arc::new(PanickyJob),
            }))
            .unwrap();

        let (tx, _rx) = mpsc::channel(1024);
        let metrics = Arc::new(SchedulerMetrics::new());
        let store = Arc::new(JobStore::new(
            Arc::new(MemoryBackend::new()),
            MisfireSettings::default(),
            metrics.clone(),
            tx,
        ));
        let dispatcher = Dispatcher::new(max_workers, registry, store.clone(), metrics.clone());
        Fixture {
            dispatcher,
            store,
            metrics,
        }
    }

    async fn fire_job(store: &JobStore, name: &str, class: &str) -> FiredJobContext {
        let now = Utc::now();
        let job = JobDefinition::new(JobKey::named(name), class);
        let trigger = Trigger::new(
            TriggerKey::named(format!("{}-trigger", name)),
            job.key.clone(),
            ScheduleVariant::every(Duration::from_secs(60)),
            now,
        );
        store.store_job(job, trigger).await.unwrap();
        let acquired = store.acquire_next_due(now).await.unwrap().unwrap();
        store.trigger_fired(&acquired.key, now).await.unwrap().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_reserve_slot_is_bounded() {
        let f = fixture(2);
        let a = f.dispatcher.reserve_slot().await.unwrap();
        let _b = f.dispatcher.reserve_slot().await.unwrap();
        assert_eq!(f.dispatcher.available_workers(), 0);

        let third = tokio::time::timeout(Duration::from_millis(50), f.dispatcher.reserve_slot()).await;
        assert!(third.is_err());

        drop(a);
        assert_eq!(f.dispatcher.available_workers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_records_success() {
        let f = fixture(4);
        let fired = fire_job(&f.store, "sleepy", "tests::Sleepy").await;
        let slot = f.dispatcher.reserve_slot().await.unwrap();
        f.dispatcher.dispatch(fired, slot);
        assert_eq!(f.dispatcher.in_flight(), 1);

        assert!(f.dispatcher.drain(true, Duration::from_secs(10)).await);
        assert_eq!(f.metrics.snapshot().succeeded, 1);
        assert_eq!(f.store.executing_count().await, 0);
        assert_eq!(f.dispatcher.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_is_a_failure() {
        let f = fixture(4);
        let fired = fire_job(&f.store, "panicky", "tests::Panicky").await;
        let trigger_key = fired.trigger_key.clone();
        let slot = f.dispatcher.reserve_slot().await.unwrap();
        f.dispatcher.dispatch(fired, slot);
        f.dispatcher.drain(true, Duration::from_secs(10)).await;

        assert_eq!(f.metrics.snapshot().failed, 1);
        let trigger = f.store.trigger(&trigger_key).await.unwrap();
        assert_eq!(trigger.state, TriggerState::Error);
        assert_eq!(trigger.last_error.as_deref(), Some("Job panicked"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresolved_class_is_a_failure() {
        let f = fixture(4);
        let fired = fire_job(&f.store, "ghost", "tests::Unregistered").await;
        let trigger_key = fired.trigger_key.clone();
        let slot = f.dispatcher.reserve_slot().await.unwrap();
        f.dispatcher.dispatch(fired, slot);
        f.dispatcher.drain(true, Duration::from_secs(10)).await;

        let trigger = f.store.trigger(&trigger_key).await.unwrap();
        assert!(trigger.last_error.unwrap().contains("not registered"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_timeout_cancels_jobs() {
        let f = fixture(4);
        let fired = fire_job(&f.store, "sleepy", "tests::Sleepy").await;
        let slot = f.dispatcher.reserve_slot().await.unwrap();
        f.dispatcher.dispatch(fired, slot);

        assert!(!f.dispatcher.drain(true, Duration::from_millis(500)).await);
        assert_eq!(f.metrics.snapshot().abandoned, 1);
        assert_eq!(f.store.executing_count().await, 0);
        assert!(matches!(
            f.dispatcher.reserve_slot().await,
            Err(SchedulerError::Shutdown)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_forced_drain_abandons_immediately() {
        let f = fixture(4);
        let fired = fire_job(&f.store, "sleepy", "tests::Sleepy").await;
        let slot = f.dispatcher.reserve_slot().await.unwrap();
        f.dispatcher.dispatch(fired, slot);

        assert!(!f.dispatcher.drain(false, Duration::from_secs(30)).await);
        assert_eq!(f.metrics.snapshot().abandoned, 1);
        assert_eq!(f.metrics.snapshot().succeeded, 0);
    }
}
