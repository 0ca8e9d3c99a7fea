//! # Cadence Scheduler
//!
//! Job scheduling engine: trigger computation, a transactional job store,
//! the scheduling loop, and a bounded execution dispatcher.
//!
//! ## Overview
//!
//! ```text
//! control API ──► JobStore ──(wakeup)──► SchedulerLoop ──► Dispatcher ──► Job
//!                    ▲                                                │
//!                    └──────────────── complete_execution ◄───────────┘
//! ```
//!
//! A [`Scheduler`] is built from a [`cadence_config::SchedulerConfig`] and a
//! [`cadence_core::JobClassRegistry`], started with [`Scheduler::start`] and
//! torn down with [`Scheduler::shutdown`].

pub mod clock;
pub mod control;
pub mod dispatcher;
pub mod fired;
pub mod job;
pub mod metrics;
pub mod scheduler;
mod scheduler_loop;
pub mod seed;
pub mod store;
pub mod trigger;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use control::{JobAck, JobSpec, JobSummary, JobWithTriggerInfo, TriggerSpec, default_trigger_name};
pub use dispatcher::{Dispatcher, ExecutionSlot};
pub use fired::{ExecutionOutcome, FiredJobContext};
pub use job::JobDefinition;
pub use metrics::{MetricsSnapshot, SchedulerMetrics};
pub use scheduler::{Scheduler, SchedulerBuilder, SchedulerState};
pub use store::{
    CompletionStatus, FileBackend, JobStore, MemoryBackend, MisfireSettings, StoreBackend,
    StoreSnapshot, WakeupSignal, backend_from_config,
};
pub use trigger::{RepeatCount, ScheduleVariant, Trigger, TriggerState};
