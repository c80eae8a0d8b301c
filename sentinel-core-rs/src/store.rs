// sentinel-core-rs/src/store.rs
// Persistence boundary for agent memory.
//
// Implementation notes:
// - One JSON document on disk holding the bounded decision log and the
//   issue-history map.
// - Saves write a sibling temp file and atomically rename it over the
//   target, so a reader can never observe a half-written document.
// - A more advanced backend (e.g. SQLite or a KV store) can be wired
//   behind the same trait later.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::decide::Decision;
use crate::tracker::IssueRecord;

/// Persisted document shape (versionless).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryDocument {
    #[serde(default)]
    pub decisions: Vec<Decision>,
    #[serde(default)]
    pub issue_history: HashMap<String, IssueRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait StateStore {
    async fn load(&self) -> Result<MemoryDocument, StoreError>;

    async fn save(&self, doc: &MemoryDocument) -> Result<(), StoreError>;
}

/// File-backed store keeping the whole memory document as one JSON file.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store using a path derived from SENTINEL_STORE_PATH or a
    /// safe default. Eagerly creates the parent directory so callers can
    /// fail fast at startup when the configured path is unwritable.
    pub fn new_default() -> Result<Self, StoreError> {
        let path = std::env::var("SENTINEL_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/sentinel/agent_memory.json"));

        if let Some(parent) = path.parent() {
            // Blocking std::fs is fine for a one-time startup check.
            std::fs::create_dir_all(parent)?;
        }

        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<MemoryDocument, StoreError> {
        if !self.path().exists() {
            return Ok(MemoryDocument::default());
        }

        let raw = fs::read_to_string(self.path()).await?;
        match serde_json::from_str(&raw) {
            Ok(doc) => Ok(doc),
            Err(err) => {
                // A corrupt document must not take the pipeline down;
                // fall back to empty state and let the next save replace it.
                tracing::warn!(
                    error = %err,
                    path = %self.path().display(),
                    "corrupt memory document; starting from empty state"
                );
                Ok(MemoryDocument::default())
            }
        }
    }

    async fn save(&self, doc: &MemoryDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path().parent() {
            fs::create_dir_all(parent).await?;
        }

        let raw = serde_json::to_vec_pretty(doc)?;
        let tmp = self.path().with_extension("json.tmp");
        fs::write(&tmp, &raw).await?;
        fs::rename(&tmp, self.path()).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_as_empty_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStateStore::new(dir.path().join("agent_memory.json"));

        let doc = store.load().await.expect("load should succeed");
        assert!(doc.decisions.is_empty());
        assert!(doc.issue_history.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_loads_as_empty_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("agent_memory.json");
        std::fs::write(&path, "{not json").expect("write");

        let store = FileStateStore::new(&path);
        let doc = store.load().await.expect("load should succeed");
        assert!(doc.decisions.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("agent_memory.json");
        let store = FileStateStore::new(&path);

        let mut doc = MemoryDocument::default();
        doc.issue_history.insert(
            "HDFC_failure_spike".to_string(),
            crate::tracker::IssueRecord {
                first_detected: chrono::Utc::now(),
                last_seen: chrono::Utc::now(),
                occurrence_count: 2,
                severity_history: vec![crate::severity::Severity::High],
                resolved: false,
                resolved_at: None,
            },
        );

        store.save(&doc).await.expect("save should succeed");
        assert!(path.exists());
        // No temp file left behind after the atomic rename.
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = store.load().await.expect("load should succeed");
        assert_eq!(loaded.issue_history.len(), 1);
        assert_eq!(
            loaded
                .issue_history
                .get("HDFC_failure_spike")
                .unwrap()
                .occurrence_count,
            2
        );
    }
}
