//! Scheduler instance: wiring, lifecycle, and shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use cadence_config::SchedulerConfig;
use cadence_core::JobClassRegistry;
use cadence_protocols::{SchedulerError, SchedulerResult};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clock::{Clock, MonotonicClock};
use crate::dispatcher::Dispatcher;
use crate::metrics::{MetricsSnapshot, SchedulerMetrics};
use crate::scheduler_loop::SchedulerLoop;
use crate::store::{JobStore, MemoryBackend, MisfireSettings, StoreBackend, WakeupSignal};

/// Scheduler lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SchedulerState {
    /// Built, loop not started. Jobs may already be scheduled.
    Created = 0,
    Running = 1,
    Stopping = 2,
    /// Terminal. No further acquisitions or control mutations.
    Shutdown = 3,
}

impl From<u8> for SchedulerState {
    fn from(v: u8) -> Self {
        match v {
            0 => SchedulerState::Created,
            1 => SchedulerState::Running,
            2 => SchedulerState::Stopping,
            3 => SchedulerState::Shutdown,
            _ => SchedulerState::Created,
        }
    }
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerState::Created => write!(f, "created"),
            SchedulerState::Running => write!(f, "running"),
            SchedulerState::Stopping => write!(f, "stopping"),
            SchedulerState::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Builder for [`Scheduler`].
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    registry: Arc<JobClassRegistry>,
    clock: Option<Arc<dyn Clock>>,
    backend: Option<Arc<dyn StoreBackend>>,
}

impl SchedulerBuilder {
    pub fn new(config: SchedulerConfig, registry: Arc<JobClassRegistry>) -> Self {
        Self {
            config,
            registry,
            clock: None,
            backend: None,
        }
    }

    /// Time source. Defaults to [`MonotonicClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Persistence backend. Defaults to [`MemoryBackend`].
    pub fn backend(mut self, backend: Arc<dyn StoreBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Build the scheduler, recovering any persisted jobs.
    pub async fn build(self) -> SchedulerResult<Arc<Scheduler>> {
        if self.config.max_workers == 0 {
            return Err(SchedulerError::Validation(
                "max_workers must be greater than 0".to_string(),
            ));
        }

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(MemoryBackend::new()));
        let metrics = Arc::new(SchedulerMetrics::new());
        let (wakeup_tx, wakeup_rx) = mpsc::channel(1024);

        let misfire = MisfireSettings {
            policy: self.config.misfire_policy,
            threshold: self.config.misfire_threshold(),
        };
        let store = Arc::new(
            JobStore::open(backend, misfire, metrics.clone(), wakeup_tx, &self.registry).await?,
        );
        let dispatcher = Arc::new(Dispatcher::new(
            self.config.max_workers,
            self.registry.clone(),
            store.clone(),
            metrics.clone(),
        ));

        Ok(Arc::new(Scheduler {
            config: self.config,
            state: AtomicU8::new(SchedulerState::Created as u8),
            registry: self.registry,
            store,
            dispatcher,
            clock,
            metrics,
            stop: CancellationToken::new(),
            wakeup_rx: parking_lot::Mutex::new(Some(wakeup_rx)),
            loop_handle: tokio::sync::Mutex::new(None),
        }))
    }
}

/// A scheduler instance.
///
/// Constructed explicitly and shared through `Arc`; torn down with
/// [`Scheduler::shutdown`].
pub struct Scheduler {
    pub(crate) config: SchedulerConfig,
    state: AtomicU8,
    pub(crate) registry: Arc<JobClassRegistry>,
    pub(crate) store: Arc<JobStore>,
    dispatcher: Arc<Dispatcher>,
    pub(crate) clock: Arc<dyn Clock>,
    metrics: Arc<SchedulerMetrics>,
    stop: CancellationToken,
    wakeup_rx: parking_lot::Mutex<Option<mpsc::Receiver<WakeupSignal>>>,
    loop_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Start building a scheduler.
    pub fn builder(config: SchedulerConfig, registry: Arc<JobClassRegistry>) -> SchedulerBuilder {
        SchedulerBuilder::new(config, registry)
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<JobClassRegistry> {
        &self.registry
    }

    /// Direct access to the job store.
    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Executions currently running.
    pub fn running_jobs(&self) -> usize {
        self.dispatcher.in_flight()
    }

    /// Start the scheduling loop.
    pub async fn start(&self) -> SchedulerResult<()> {
        if self
            .state
            .compare_exchange(
                SchedulerState::Created as u8,
                SchedulerState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return match self.state() {
                SchedulerState::Running => Err(SchedulerError::Internal(
                    "Scheduler is already running".to_string(),
                )),
                _ => Err(SchedulerError::Shutdown),
            };
        }

        let Some(wakeup_rx) = self.wakeup_rx.lock().take() else {
            return Err(SchedulerError::Internal(
                "Scheduler loop was already started".to_string(),
            ));
        };

        let scheduler_loop = SchedulerLoop {
            instance_name: self.config.instance_name.clone(),
            store: self.store.clone(),
            dispatcher: self.dispatcher.clone(),
            clock: self.clock.clone(),
            metrics: self.metrics.clone(),
            idle_wait: self.config.idle_wait(),
            wakeup_rx,
            stop: self.stop.clone(),
        };

        self.metrics.mark_start();
        *self.loop_handle.lock().await = Some(tokio::spawn(scheduler_loop.run()));
        info!(
            "Scheduler '{}' started with {} workers",
            self.config.instance_name, self.config.max_workers
        );
        Ok(())
    }

    /// Stop acquiring triggers and tear the scheduler down.
    ///
    /// With `wait_for_jobs`, running jobs get the configured shutdown timeout
    /// to finish before they are cancelled; otherwise they are cancelled
    /// immediately. Calling it again is a no-op.
    pub async fn shutdown(&self, wait_for_jobs: bool) -> SchedulerResult<()> {
        let previous = self.state();
        if matches!(previous, SchedulerState::Stopping | SchedulerState::Shutdown) {
            return Ok(());
        }
        self.set_state(SchedulerState::Stopping);
        info!(
            "Scheduler '{}' shutting down (wait_for_jobs: {})",
            self.config.instance_name, wait_for_jobs
        );

        self.stop.cancel();
        if let Some(handle) = self.loop_handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Scheduler loop ended abnormally: {}", e);
            }
        }

        let finished = self
            .dispatcher
            .drain(wait_for_jobs, self.config.shutdown.timeout())
            .await;
        if !finished && wait_for_jobs {
            warn!("Some jobs were cancelled during shutdown");
        }

        self.set_state(SchedulerState::Shutdown);
        info!("Scheduler '{}' shut down", self.config.instance_name);
        Ok(())
    }

    /// Shut down using the configured `wait_for_jobs`.
    pub async fn shutdown_with_config(&self) -> SchedulerResult<()> {
        self.shutdown(self.config.shutdown.wait_for_jobs).await
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(
            self.state(),
            SchedulerState::Stopping | SchedulerState::Shutdown
        )
    }

    /// Fail with [`SchedulerError::Shutdown`] once shutdown has begun.
    pub(crate) fn ensure_accepting(&self) -> SchedulerResult<()> {
        if self.is_shutdown() {
            Err(SchedulerError::Shutdown)
        } else {
            Ok(())
        }
    }
}
