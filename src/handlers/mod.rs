//! Content handlers, one per artifact type
//!
//! A handler ingests the changed content files of a project version into
//! type-specific storage and deletes that storage again on retirement.

pub mod memory;

pub use memory::{InMemoryArtifactsHandler, Ingestion};

use crate::domain::{MetadataEventResponse, ProjectData};
use crate::error::DepotResult;
use crate::repository::ArtifactType;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Ingests and deletes the artifacts of one type
#[async_trait]
pub trait ArtifactsHandler: Send + Sync {
    /// The artifact type this handler owns
    fn artifact_type(&self) -> ArtifactType;

    /// Ingest changed files for a project version
    ///
    /// Recoverable problems are reported on the response; an `Err` aborts
    /// the refresh of this version.
    async fn ingest(
        &self,
        project: &ProjectData,
        version_id: &str,
        files: &[PathBuf],
    ) -> DepotResult<MetadataEventResponse>;

    /// Remove every stored artifact of a project version
    async fn delete(&self, group_id: &str, artifact_id: &str, version_id: &str) -> DepotResult<()>;
}

/// Handlers indexed by the artifact type they own
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<ArtifactType, Arc<dyn ArtifactsHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for its type
    pub fn register(&mut self, handler: Arc<dyn ArtifactsHandler>) -> &mut Self {
        self.handlers.insert(handler.artifact_type(), handler);
        self
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, handler: Arc<dyn ArtifactsHandler>) -> Self {
        self.register(handler);
        self
    }

    pub fn get(&self, artifact_type: ArtifactType) -> Option<Arc<dyn ArtifactsHandler>> {
        self.handlers.get(&artifact_type).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
