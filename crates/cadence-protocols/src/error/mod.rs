//! Error types for the Cadence protocol layer.

mod job;
mod scheduler;

pub use job::*;
pub use scheduler::*;
