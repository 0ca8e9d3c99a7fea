//! Job protocol definitions.
//!
//! Job logic is registered once at startup as a [`JobFactory`] keyed by a
//! fully-qualified class identifier and resolved by that identifier when a
//! job is created or fired.

mod context;
mod definition;
mod traits;

pub use context::*;
pub use definition::*;
pub use traits::*;
