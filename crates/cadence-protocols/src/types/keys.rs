//! Job and trigger identities.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// Group used when the caller does not name one.
pub const DEFAULT_GROUP: &str = "DEFAULT";

/// Longest accepted name or group.
pub const MAX_KEY_LEN: usize = 200;

fn validate_part(kind: &str, part: &str, value: &str) -> Result<(), SchedulerError> {
    if value.trim().is_empty() {
        return Err(SchedulerError::Validation(format!(
            "{} {} must not be empty",
            kind, part
        )));
    }
    if value.trim() != value {
        return Err(SchedulerError::Validation(format!(
            "{} {} must not have leading or trailing whitespace",
            kind, part
        )));
    }
    if value.len() > MAX_KEY_LEN {
        return Err(SchedulerError::Validation(format!(
            "{} {} exceeds {} characters",
            kind, part, MAX_KEY_LEN
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(SchedulerError::Validation(format!(
            "{} {} contains control characters",
            kind, part
        )));
    }
    Ok(())
}

macro_rules! define_key {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name {
            pub name: String,
            pub group: String,
        }

        impl $name {
            /// Create a key in an explicit group.
            pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
                Self {
                    name: name.into(),
                    group: group.into(),
                }
            }

            /// Create a key in [`DEFAULT_GROUP`].
            pub fn named(name: impl Into<String>) -> Self {
                Self::new(name, DEFAULT_GROUP)
            }

            /// Reject empty, padded, oversized or control-character identities.
            pub fn validate(&self) -> Result<(), SchedulerError> {
                validate_part($kind, "name", &self.name)?;
                validate_part($kind, "group", &self.group)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}.{}", self.group, self.name)
            }
        }
    };
}

define_key!(
    /// Unique identity of a job definition.
    JobKey,
    "job"
);

define_key!(
    /// Unique identity of a trigger.
    TriggerKey,
    "trigger"
);

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
