//! Scheduler metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scheduler metrics.
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    /// Fire events handed to the dispatcher.
    pub fired: AtomicU64,

    /// Executions that returned `Ok`.
    pub succeeded: AtomicU64,

    /// Executions that failed, panicked, or whose class could not be resolved.
    pub failed: AtomicU64,

    /// Triggers found past the misfire threshold.
    pub misfired: AtomicU64,

    /// Executions cancelled by a forced shutdown.
    pub abandoned: AtomicU64,

    /// Outcomes dropped because the job was deleted mid-execution.
    pub discarded: AtomicU64,

    start_time: parking_lot::RwLock<Option<Instant>>,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_start(&self) {
        *self.start_time.write() = Some(Instant::now());
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time
            .read()
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn record_fired(&self) {
        self.fired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_misfired(&self, count: u64) {
        self.misfired.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_abandoned(&self) {
        self.abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            uptime_secs: self.uptime_secs(),
            fired: self.fired.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            misfired: self.misfired.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
    pub fired: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub misfired: u64,
    pub abandoned: u64,
    pub discarded: u64,
}

impl MetricsSnapshot {
    /// Executions that finished with an outcome, recorded or not.
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed + self.abandoned
    }

    /// Fraction of finished executions that failed.
    pub fn failure_rate(&self) -> f64 {
        let completed = self.completed();
        if completed == 0 {
            0.0
        } else {
            self.failed as f64 / completed as f64
        }
    }
}
