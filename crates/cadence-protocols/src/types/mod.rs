//! Shared identity types.

mod keys;

pub use keys::*;
