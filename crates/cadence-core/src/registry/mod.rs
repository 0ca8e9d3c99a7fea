//! Registries.

mod base;
mod job_class;

pub use base::{BaseRegistry, Registerable};
pub use job_class::JobClassRegistry;
