//! Checkpoint persistence for workflow runs.
//!
//! State is keyed by thread id so a multi-turn session can resume where it
//! left off. The engine only requires that the store round-trips the full
//! state shape losslessly; per-key atomicity is the store's responsibility.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Error during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Trait for persisting run state keyed by thread id.
#[async_trait]
pub trait Checkpointer<S>: Send + Sync {
    /// Load the last saved state for a thread.
    async fn load(&self, thread_id: &str) -> Result<Option<S>, CheckpointError>;

    /// Save the state for a thread, replacing any previous snapshot.
    async fn save(&self, thread_id: &str, state: &S) -> Result<(), CheckpointError>;

    /// Delete a thread's saved state.
    async fn delete(&self, thread_id: &str) -> Result<(), CheckpointError>;

    /// List all thread ids with saved state.
    async fn list_threads(&self) -> Result<Vec<String>, CheckpointError>;
}

/// In-memory checkpoint store.
#[derive(Clone)]
pub struct InMemoryCheckpointer<S> {
    states: Arc<RwLock<HashMap<String, S>>>,
}

impl<S> InMemoryCheckpointer<S> {
    /// Create a new in-memory store.
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Clear all stored state.
    pub fn clear(&self) {
        self.states.write().clear();
    }

    /// Number of stored threads.
    pub fn thread_count(&self) -> usize {
        self.states.read().len()
    }
}

impl<S> Default for InMemoryCheckpointer<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S> Checkpointer<S> for InMemoryCheckpointer<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn load(&self, thread_id: &str) -> Result<Option<S>, CheckpointError> {
        Ok(self.states.read().get(thread_id).cloned())
    }

    async fn save(&self, thread_id: &str, state: &S) -> Result<(), CheckpointError> {
        self.states
            .write()
            .insert(thread_id.to_string(), state.clone());
        Ok(())
    }

    async fn delete(&self, thread_id: &str) -> Result<(), CheckpointError> {
        self.states.write().remove(thread_id);
        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointError> {
        Ok(self.states.read().keys().cloned().collect())
    }
}

/// File-based checkpoint store, one JSON snapshot per thread.
pub struct FileCheckpointer {
    directory: PathBuf,
}

impl FileCheckpointer {
    /// Create a new file-based store rooted at `directory`.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Ensure the directory exists.
    pub async fn ensure_dir(&self) -> Result<(), CheckpointError> {
        tokio::fs::create_dir_all(&self.directory).await?;
        Ok(())
    }

    fn state_path(&self, thread_id: &str) -> PathBuf {
        self.directory.join(format!("{thread_id}_state.json"))
    }
}

#[async_trait]
impl<S> Checkpointer<S> for FileCheckpointer
where
    S: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn load(&self, thread_id: &str) -> Result<Option<S>, CheckpointError> {
        let path = self.state_path(thread_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&path).await?;
        let state: S = serde_json::from_str(&content)?;
        Ok(Some(state))
    }

    async fn save(&self, thread_id: &str, state: &S) -> Result<(), CheckpointError> {
        self.ensure_dir().await?;
        let path = self.state_path(thread_id);
        let content = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&path, content).await?;
        Ok(())
    }

    async fn delete(&self, thread_id: &str) -> Result<(), CheckpointError> {
        let path = self.state_path(thread_id);
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }

    async fn list_threads(&self) -> Result<Vec<String>, CheckpointError> {
        if !self.directory.exists() {
            return Ok(Vec::new());
        }
        let mut threads = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(thread_id) = name.strip_suffix("_state.json") {
                threads.push(thread_id.to_string());
            }
        }
        Ok(threads)
    }
}
