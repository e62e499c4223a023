//! In-memory stores

use crate::domain::{ProjectCoordinate, ProjectData, RefreshStatus, VersionKey};
use crate::error::DepotResult;
use crate::store::{DigestIndex, ProjectStore, QueryMetrics, RefreshStatusStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Project aggregates keyed by coordinate
#[derive(Debug, Default)]
pub struct InMemoryProjectStore {
    projects: RwLock<BTreeMap<ProjectCoordinate, ProjectData>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn find(&self, group_id: &str, artifact_id: &str) -> DepotResult<Option<ProjectData>> {
        Ok(self
            .projects
            .read()
            .await
            .get(&ProjectCoordinate::new(group_id, artifact_id))
            .cloned())
    }

    async fn list_all(&self) -> DepotResult<Vec<ProjectData>> {
        Ok(self.projects.read().await.values().cloned().collect())
    }

    async fn upsert(&self, project: &ProjectData) -> DepotResult<()> {
        self.projects
            .write()
            .await
            .insert(project.coordinate(), project.clone());
        Ok(())
    }
}

/// Refresh status records with an atomic start transition
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    statuses: RwLock<HashMap<VersionKey, RefreshStatus>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshStatusStore for InMemoryStatusStore {
    async fn get(&self, key: &VersionKey) -> DepotResult<RefreshStatus> {
        Ok(self
            .statuses
            .read()
            .await
            .get(key)
            .cloned()
            .unwrap_or_else(|| RefreshStatus::new(key.clone())))
    }

    async fn upsert(&self, status: &RefreshStatus) -> DepotResult<()> {
        self.statuses
            .write()
            .await
            .insert(status.key.clone(), status.clone());
        Ok(())
    }

    async fn try_start(&self, key: &VersionKey) -> DepotResult<Option<RefreshStatus>> {
        // Check and set under one write lock
        let mut statuses = self.statuses.write().await;
        let current = statuses
            .get(key)
            .cloned()
            .unwrap_or_else(|| RefreshStatus::new(key.clone()));

        if current.running {
            return Ok(None);
        }

        let started = current.start_running();
        statuses.insert(key.clone(), started.clone());
        Ok(Some(started))
    }
}

/// File digests keyed by path
#[derive(Debug, Default)]
pub struct InMemoryDigestIndex {
    digests: RwLock<HashMap<PathBuf, String>>,
}

impl InMemoryDigestIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DigestIndex for InMemoryDigestIndex {
    async fn get(&self, path: &Path) -> DepotResult<Option<String>> {
        Ok(self.digests.read().await.get(path).cloned())
    }

    async fn record(&self, path: &Path, digest: &str) -> DepotResult<()> {
        self.digests
            .write()
            .await
            .insert(path.to_path_buf(), digest.to_string());
        Ok(())
    }
}

/// Last-use timestamps per project version
#[derive(Debug, Default)]
pub struct InMemoryQueryMetrics {
    last_used: RwLock<HashMap<VersionKey, DateTime<Utc>>>,
}

impl InMemoryQueryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a use at an explicit time
    pub async fn record_at(&self, key: &VersionKey, at: DateTime<Utc>) {
        self.last_used.write().await.insert(key.clone(), at);
    }
}

#[async_trait]
impl QueryMetrics for InMemoryQueryMetrics {
    async fn record(&self, key: &VersionKey) -> DepotResult<()> {
        self.record_at(key, Utc::now()).await;
        Ok(())
    }

    async fn last_used(&self, key: &VersionKey) -> DepotResult<Option<DateTime<Utc>>> {
        Ok(self.last_used.read().await.get(key).copied())
    }
}
