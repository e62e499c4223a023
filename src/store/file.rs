//! JSON-file backed digest index
//!
//! Keeps every [`ArtifactDigestEntry`] in a single `digests.json` under the
//! state directory. The file is read once and rewritten on every record.

use crate::config::ConfigManager;
use crate::digest::ArtifactDigestEntry;
use crate::error::{DepotError, DepotResult};
use crate::store::DigestIndex;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

/// Digest index persisted as a JSON array of entries
#[derive(Debug)]
pub struct FileDigestIndex {
    path: PathBuf,
    entries: Mutex<Option<BTreeMap<PathBuf, String>>>,
}

impl FileDigestIndex {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            entries: Mutex::new(None),
        }
    }

    /// Index at the default location in the state directory
    pub fn default_location() -> Self {
        Self::new(ConfigManager::digest_index_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_entries(&self) -> DepotResult<BTreeMap<PathBuf, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            DepotError::io(format!("reading digest index {}", self.path.display()), e)
        })?;
        let entries: Vec<ArtifactDigestEntry> = serde_json::from_str(&content)?;
        debug!(
            "Loaded {} digests from {}",
            entries.len(),
            self.path.display()
        );

        Ok(entries
            .into_iter()
            .map(|e| (e.file_path, e.content_hash))
            .collect())
    }

    async fn write_entries(&self, entries: &BTreeMap<PathBuf, String>) -> DepotResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DepotError::io("creating digest index directory", e))?;
        }

        let list: Vec<ArtifactDigestEntry> = entries
            .iter()
            .map(|(path, hash)| ArtifactDigestEntry::new(path.clone(), hash.clone()))
            .collect();
        let content = serde_json::to_string_pretty(&list)?;
        fs::write(&self.path, content).await.map_err(|e| {
            DepotError::io(format!("writing digest index {}", self.path.display()), e)
        })
    }
}

#[async_trait]
impl DigestIndex for FileDigestIndex {
    async fn get(&self, path: &Path) -> DepotResult<Option<String>> {
        let mut cached = self.entries.lock().await;
        if cached.is_none() {
            *cached = Some(self.read_entries().await?);
        }
        Ok(cached.as_ref().and_then(|entries| entries.get(path).cloned()))
    }

    async fn record(&self, path: &Path, digest: &str) -> DepotResult<()> {
        let mut cached = self.entries.lock().await;
        let mut entries = match cached.take() {
            Some(entries) => entries,
            None => self.read_entries().await?,
        };
        entries.insert(path.to_path_buf(), digest.to_string());
        let written = self.write_entries(&entries).await;
        *cached = Some(entries);
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let index = FileDigestIndex::new(temp.path().join("digests.json"));
        assert!(index.get(Path::new("/a.json")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state").join("digests.json");

        let index = FileDigestIndex::new(path.clone());
        index.record(Path::new("/a.json"), "aaa").await.unwrap();
        index.record(Path::new("/b.json"), "bbb").await.unwrap();
        index.record(Path::new("/a.json"), "ccc").await.unwrap();

        let reopened = FileDigestIndex::new(path);
        assert_eq!(
            reopened.get(Path::new("/a.json")).await.unwrap().as_deref(),
            Some("ccc")
        );
        assert_eq!(
            reopened.get(Path::new("/b.json")).await.unwrap().as_deref(),
            Some("bbb")
        );
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("digests.json");
        fs::write(&path, "not json").await.unwrap();

        let index = FileDigestIndex::new(path);
        let err = index.get(Path::new("/a.json")).await.unwrap_err();
        assert!(matches!(err, DepotError::Json(_)));
    }
}
