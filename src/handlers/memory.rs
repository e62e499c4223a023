//! Recording content handler

use crate::domain::{ErrorKind, MetadataEventResponse, ProjectData, VersionKey};
use crate::error::DepotResult;
use crate::handlers::ArtifactsHandler;
use crate::repository::ArtifactType;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// One call to [`ArtifactsHandler::ingest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingestion {
    pub key: VersionKey,
    pub files: Vec<PathBuf>,
}

/// Handler that records what it was asked to do
///
/// Versions can be marked failing, in which case ingestion reports a
/// content error on the response.
#[derive(Debug)]
pub struct InMemoryArtifactsHandler {
    artifact_type: ArtifactType,
    ingestions: RwLock<Vec<Ingestion>>,
    deletions: RwLock<Vec<VersionKey>>,
    failing: RwLock<HashSet<VersionKey>>,
}

impl InMemoryArtifactsHandler {
    pub fn new(artifact_type: ArtifactType) -> Self {
        Self {
            artifact_type,
            ingestions: RwLock::new(Vec::new()),
            deletions: RwLock::new(Vec::new()),
            failing: RwLock::new(HashSet::new()),
        }
    }

    /// Make ingestion of a version report an error
    pub async fn fail_on(&self, key: VersionKey) {
        self.failing.write().await.insert(key);
    }

    pub async fn ingestions(&self) -> Vec<Ingestion> {
        self.ingestions.read().await.clone()
    }

    pub async fn deletions(&self) -> Vec<VersionKey> {
        self.deletions.read().await.clone()
    }
}

#[async_trait]
impl ArtifactsHandler for InMemoryArtifactsHandler {
    fn artifact_type(&self) -> ArtifactType {
        self.artifact_type
    }

    async fn ingest(
        &self,
        project: &ProjectData,
        version_id: &str,
        files: &[PathBuf],
    ) -> DepotResult<MetadataEventResponse> {
        let key = project.coordinate().version(version_id);
        let mut response = MetadataEventResponse::new();

        if self.failing.read().await.contains(&key) {
            response.add_error(
                ErrorKind::Content,
                format!("{} ingestion failed for [{}]", self.artifact_type, key),
            );
            return Ok(response);
        }

        self.ingestions.write().await.push(Ingestion {
            key: key.clone(),
            files: files.to_vec(),
        });
        response.add_message(format!(
            "[{}] {} files processed for [{}]",
            files.len(),
            self.artifact_type,
            key
        ));
        Ok(response)
    }

    async fn delete(&self, group_id: &str, artifact_id: &str, version_id: &str) -> DepotResult<()> {
        self.deletions
            .write()
            .await
            .push(VersionKey::new(group_id, artifact_id, version_id));
        Ok(())
    }
}
