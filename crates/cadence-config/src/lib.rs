//! # Cadence Config
//!
//! Configuration management for the Cadence scheduler: TOML schema with
//! `${VAR}` substitution, loading, and validation.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
