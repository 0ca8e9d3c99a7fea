//! Stored job definitions.

use cadence_protocols::{ConcurrencyPolicy, JobKey};
use serde::{Deserialize, Serialize};

/// A job as held by the store.
///
/// The job class is kept as its registered identifier and resolved through
/// the job class registry on every fire, so definitions survive a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub key: JobKey,
    pub job_class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub concurrency: ConcurrencyPolicy,
}

impl JobDefinition {
    pub fn new(key: JobKey, job_class: impl Into<String>) -> Self {
        Self {
            key,
            job_class: job_class.into(),
            description: None,
            concurrency: ConcurrencyPolicy::default(),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_concurrency(mut self, concurrency: ConcurrencyPolicy) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn is_exclusive(&self) -> bool {
        self.concurrency.is_exclusive()
    }
}
