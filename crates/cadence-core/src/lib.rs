//! # Cadence Core
//!
//! Registries shared by the scheduler and its front ends.
//!
//! - [`JobClassRegistry`] - maps job class identifiers to factories; filled
//!   once at startup and looked up (never reflected) when jobs are created
//!   or fired.

pub mod error;
pub mod registry;

pub use error::RegistryError;
pub use registry::{BaseRegistry, JobClassRegistry, Registerable};
