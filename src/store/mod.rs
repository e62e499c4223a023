//! Persistence boundaries consumed by the refresh engine
//!
//! The engine never owns storage. It reads and writes through these
//! traits, which production deployments back with their own database.
//! In-memory implementations live in [`memory`]; a JSON-file digest index
//! lives in [`file`].

pub mod file;
pub mod memory;

pub use file::FileDigestIndex;
pub use memory::{InMemoryDigestIndex, InMemoryProjectStore, InMemoryQueryMetrics, InMemoryStatusStore};

use crate::domain::{ProjectData, RefreshStatus, VersionKey};
use crate::error::DepotResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;

/// CRUD over the project aggregate
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn find(&self, group_id: &str, artifact_id: &str) -> DepotResult<Option<ProjectData>>;

    async fn list_all(&self) -> DepotResult<Vec<ProjectData>>;

    /// Insert or replace the project keyed by its coordinate
    async fn upsert(&self, project: &ProjectData) -> DepotResult<()>;
}

/// Per-key refresh run state
#[async_trait]
pub trait RefreshStatusStore: Send + Sync {
    /// Current status; an idle status for keys never seen
    async fn get(&self, key: &VersionKey) -> DepotResult<RefreshStatus>;

    async fn upsert(&self, status: &RefreshStatus) -> DepotResult<()>;

    /// Atomically mark the key running if it is not already
    ///
    /// Returns the running status on success, `None` when another run
    /// holds the key.
    async fn try_start(&self, key: &VersionKey) -> DepotResult<Option<RefreshStatus>>;
}

/// Last-seen content digest per file path
#[async_trait]
pub trait DigestIndex: Send + Sync {
    async fn get(&self, path: &Path) -> DepotResult<Option<String>>;

    async fn record(&self, path: &Path, digest: &str) -> DepotResult<()>;
}

/// Usage observations per project version
#[async_trait]
pub trait QueryMetrics: Send + Sync {
    /// Record a use of the version now
    async fn record(&self, key: &VersionKey) -> DepotResult<()>;

    /// Most recent recorded use, if any
    async fn last_used(&self, key: &VersionKey) -> DepotResult<Option<DateTime<Utc>>>;
}
