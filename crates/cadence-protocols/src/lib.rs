//! # Cadence Protocols
//!
//! Core protocol definitions for the Cadence scheduler.
//! Contains only interface definitions - no scheduling logic.
//!
//! ## Core Traits
//!
//! - [`Job`] - Executable job logic invoked on each fire event
//! - [`JobFactory`] - Produces job instances for a registered job class
//!
//! ## Identity
//!
//! - [`JobKey`] / [`TriggerKey`] - `(name, group)` identities

pub mod error;
pub mod job;
pub mod types;

pub use error::{CompletionInstruction, JobExecutionError, SchedulerError, SchedulerResult};
pub use job::{ConcurrencyPolicy, Job, JobClassInfo, JobExecutionContext, JobFactory};
pub use types::*;
