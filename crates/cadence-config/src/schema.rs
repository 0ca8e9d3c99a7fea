//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Jobs created at startup.
    #[serde(default)]
    pub jobs: Vec<JobSeedConfig>,
}

/// What to do with a trigger whose fire time has slipped past the misfire threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MisfirePolicy {
    /// Fire once immediately, then continue the normal schedule from that fire.
    #[default]
    FireOnceNow,
    /// Skip the missed slots and wait for the next one after now.
    RescheduleNext,
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Instance name used in log lines.
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Maximum number of jobs executing at once.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    #[serde(default = "default_misfire_threshold_ms")]
    pub misfire_threshold_ms: u64,

    #[serde(default)]
    pub misfire_policy: MisfirePolicy,

    /// Upper bound on how long the loop sleeps when nothing is scheduled.
    #[serde(default = "default_idle_wait_ms")]
    pub idle_wait_ms: u64,

    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            max_workers: default_max_workers(),
            misfire_threshold_ms: default_misfire_threshold_ms(),
            misfire_policy: MisfirePolicy::default(),
            idle_wait_ms: default_idle_wait_ms(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn misfire_threshold(&self) -> Duration {
        Duration::from_millis(self.misfire_threshold_ms)
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }
}

fn default_instance_name() -> String {
    "cadence".to_string()
}

fn default_max_workers() -> usize {
    10
}

fn default_misfire_threshold_ms() -> u64 {
    60_000
}

fn default_idle_wait_ms() -> u64 {
    30_000
}

/// Shutdown behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// Wait for in-flight jobs instead of cancelling them.
    #[serde(default = "default_true")]
    pub wait_for_jobs: bool,

    #[serde(default = "default_shutdown_timeout")]
    pub timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            wait_for_jobs: true,
            timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl ShutdownConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_true() -> bool {
    true
}

fn default_shutdown_timeout() -> u64 {
    30
}

/// Job store backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendKind {
    #[default]
    Memory,
    File,
}

/// Job store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackendKind,

    /// Directory for the file backend snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    #[serde(default = "default_true")]
    pub file_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
            file_enabled: true,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// A job to create at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSeedConfig {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Fully-qualified job class identifier.
    pub job_class: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_workers, 10);
        assert_eq!(config.misfire_threshold(), Duration::from_secs(60));
        assert_eq!(config.idle_wait(), Duration::from_secs(30));
        assert_eq!(config.misfire_policy, MisfirePolicy::FireOnceNow);
        assert!(config.shutdown.wait_for_jobs);
        assert_eq!(config.shutdown.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_logging_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.file_enabled);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_misfire_policy_serde() {
        let config: SchedulerConfig =
            toml::from_str("misfire_policy = \"reschedule_next\"").unwrap();
        assert_eq!(config.misfire_policy, MisfirePolicy::RescheduleNext);
        assert!(toml::from_str::<SchedulerConfig>("misfire_policy = \"later\"").is_err());
    }

    #[test]
    fn test_config_serialize_roundtrip() {
        let config = Config::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.scheduler.instance_name, config.scheduler.instance_name);
        assert_eq!(parsed.store.backend, StoreBackendKind::Memory);
    }

    #[test]
    fn test_seed_job_requires_class() {
        let result = toml::from_str::<JobSeedConfig>("name = \"a\"");
        assert!(result.is_err());
    }
}
