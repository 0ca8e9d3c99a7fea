//! Persistence backends for the job store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cadence_config::{ConfigLoader, StoreBackendKind, StoreConfig};
use cadence_protocols::{JobKey, SchedulerError, SchedulerResult};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::job::JobDefinition;
use crate::trigger::Trigger;

const SNAPSHOT_FILE: &str = "store.json";

/// Everything the store persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub jobs: Vec<JobDefinition>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub paused_jobs: Vec<JobKey>,
}

/// Durable storage for store snapshots.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Load the last persisted snapshot, if any.
    async fn load(&self) -> SchedulerResult<Option<StoreSnapshot>>;

    /// Persist a full snapshot, replacing the previous one.
    async fn persist(&self, snapshot: &StoreSnapshot) -> SchedulerResult<()>;

    /// Whether `persist` needs to be called at all.
    fn is_durable(&self) -> bool {
        true
    }
}

/// Backend that keeps nothing.
#[derive(Debug, Default)]
pub struct MemoryBackend;

impl MemoryBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn load(&self) -> SchedulerResult<Option<StoreSnapshot>> {
        Ok(None)
    }

    async fn persist(&self, _snapshot: &StoreSnapshot) -> SchedulerResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }
}

/// Backend writing a JSON snapshot into a directory.
///
/// Writes go to a temporary file that is then renamed over the snapshot, so
/// a crash mid-write leaves the previous snapshot intact.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Create the backend, creating `dir` if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> SchedulerResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            SchedulerError::Persistence(format!("Failed to create store directory: {}", e))
        })?;

        debug!("FileBackend initialized at {:?}", dir);
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn snapshot_path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!("{}.tmp", SNAPSHOT_FILE))
    }
}

#[async_trait]
impl StoreBackend for FileBackend {
    async fn load(&self) -> SchedulerResult<Option<StoreSnapshot>> {
        let path = self.snapshot_path();
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await.map_err(|e| {
            SchedulerError::Persistence(format!("Failed to read {:?}: {}", path, e))
        })?;
        let snapshot: StoreSnapshot = serde_json::from_str(&content)?;

        debug!(
            "Loaded {} jobs and {} triggers from {:?}",
            snapshot.jobs.len(),
            snapshot.triggers.len(),
            path
        );
        Ok(Some(snapshot))
    }

    async fn persist(&self, snapshot: &StoreSnapshot) -> SchedulerResult<()> {
        let content = serde_json::to_string_pretty(snapshot)?;
        let temp = self.temp_path();

        fs::write(&temp, content).await.map_err(|e| {
            SchedulerError::Persistence(format!("Failed to write {:?}: {}", temp, e))
        })?;
        fs::rename(&temp, self.snapshot_path()).await.map_err(|e| {
            SchedulerError::Persistence(format!("Failed to replace store snapshot: {}", e))
        })?;
        Ok(())
    }
}

/// Build the backend selected by configuration.
pub async fn backend_from_config(config: &StoreConfig) -> SchedulerResult<Arc<dyn StoreBackend>> {
    match config.backend {
        StoreBackendKind::Memory => Ok(Arc::new(MemoryBackend::new())),
        StoreBackendKind::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                SchedulerError::Validation("store.path is required for the file backend".to_string())
            })?;
            let backend = FileBackend::new(ConfigLoader::expand_path(path)).await?;
            Ok(Arc::new(backend))
        }
    }
}
