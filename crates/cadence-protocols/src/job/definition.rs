//! Job class metadata.

use serde::{Deserialize, Serialize};

/// Whether executions of one job may overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    #[default]
    AllowConcurrent,
    /// Fire events that arrive while an execution is running are deferred
    /// until it completes.
    DisallowConcurrent,
}

impl ConcurrencyPolicy {
    pub fn is_exclusive(&self) -> bool {
        matches!(self, ConcurrencyPolicy::DisallowConcurrent)
    }
}

/// Describes a registered job class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobClassInfo {
    /// Short display name, e.g. `LoggingBackgroundJob`.
    pub name: String,
    /// Identifier callers pass when creating a job.
    pub full_name: String,
}

impl JobClassInfo {
    pub fn new(name: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_name: full_name.into(),
        }
    }
}
