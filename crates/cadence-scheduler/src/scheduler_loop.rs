//! The coordinating loop: acquire due triggers, fire them, sleep until the
//! next one.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::dispatcher::Dispatcher;
use crate::metrics::SchedulerMetrics;
use crate::store::{JobStore, WakeupSignal};

/// Pause after a store error before retrying.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Result of one attempt to fire a due trigger.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Fired,
    Idle,
    /// The store failed; back off before trying again.
    Retry,
}

/// Why the loop stopped waiting.
#[derive(Debug)]
enum Wakeup {
    Timer,
    Signal(WakeupSignal),
    Stop,
}

pub(crate) struct SchedulerLoop {
    pub(crate) instance_name: String,
    pub(crate) store: Arc<JobStore>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) metrics: Arc<SchedulerMetrics>,
    pub(crate) idle_wait: Duration,
    pub(crate) wakeup_rx: mpsc::Receiver<WakeupSignal>,
    pub(crate) stop: CancellationToken,
}

impl SchedulerLoop {
    pub(crate) async fn run(mut self) {
        info!("Scheduler '{}' loop started", self.instance_name);

        while !self.stop.is_cancelled() {
            let backoff = match self.fire_due().await {
                Step::Fired => continue,
                Step::Idle => None,
                Step::Retry => Some(ERROR_BACKOFF),
            };

            match self.wait(backoff).await {
                Wakeup::Timer => debug!("Scheduler woke: timer"),
                Wakeup::Signal(WakeupSignal::StoreChanged { reason }) => {
                    debug!("Scheduler woke: {}", reason)
                }
                Wakeup::Stop => break,
            }
        }

        info!("Scheduler '{}' loop stopped", self.instance_name);
    }

    /// Fire at most one due trigger.
    async fn fire_due(&self) -> Step {
        let slot = tokio::select! {
            slot = self.dispatcher.reserve_slot() => match slot {
                Ok(slot) => slot,
                Err(_) => return Step::Idle,
            },
            _ = self.stop.cancelled() => return Step::Idle,
        };

        let acquired = match self.store.acquire_next_due(self.clock.now()).await {
            Ok(Some(trigger)) => trigger,
            Ok(None) => return Step::Idle,
            Err(e) => {
                warn!("Failed to acquire due trigger: {}", e);
                return Step::Retry;
            }
        };

        match self.store.trigger_fired(&acquired.key, self.clock.now()).await {
            Ok(Some(fired)) => {
                self.metrics.record_fired();
                debug!(
                    "Firing job {} via trigger {} (scheduled {})",
                    fired.job.key, fired.trigger_key, fired.scheduled_fire_time
                );
                self.dispatcher.dispatch(fired, slot);
            }
            Ok(None) => {
                debug!("Trigger {} no longer fireable, skipping", acquired.key);
            }
            Err(e) => {
                warn!("Failed to fire trigger {}: {}", acquired.key, e);
                if let Err(e) = self.store.release_acquired(&acquired.key).await {
                    warn!("Failed to release trigger {}: {}", acquired.key, e);
                }
                return Step::Retry;
            }
        }
        Step::Fired
    }

    /// Sleep until the next fire time, the idle cap, a store change, or stop.
    async fn wait(&mut self, backoff: Option<Duration>) -> Wakeup {
        let now = self.clock.now();
        let deadline = match backoff {
            Some(backoff) => add(now, backoff),
            None => {
                let idle_deadline = add(now, self.idle_wait);
                match self.store.next_fire_time().await {
                    Some(next) => next.min(idle_deadline),
                    None => idle_deadline,
                }
            }
        };

        tokio::select! {
            _ = self.clock.sleep_until(deadline) => Wakeup::Timer,
            signal = self.wakeup_rx.recv() => match signal {
                Some(signal) => Wakeup::Signal(signal),
                None => Wakeup::Stop,
            },
            _ = self.stop.cancelled() => Wakeup::Stop,
        }
    }
}

fn add(now: DateTime<Utc>, wait: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(wait)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
