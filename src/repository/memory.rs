//! In-memory upstream repository

use crate::domain::{ProjectCoordinate, VersionKey};
use crate::error::{DepotError, DepotResult};
use crate::repository::{ArtifactRepository, ArtifactType};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct UpstreamProject {
    versions: Vec<String>,
    dependencies: HashMap<String, BTreeSet<VersionKey>>,
    files: HashMap<(ArtifactType, String), Vec<PathBuf>>,
    properties: HashMap<String, BTreeMap<String, String>>,
}

/// Upstream repository backed by in-process maps
///
/// Unknown coordinates list no versions. Coordinates can be marked invalid
/// or unreachable to exercise failure paths.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    projects: RwLock<HashMap<ProjectCoordinate, UpstreamProject>>,
    invalid: RwLock<HashSet<ProjectCoordinate>>,
    unreachable: RwLock<HashSet<ProjectCoordinate>>,
    calls: AtomicUsize,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish versions for a project
    pub async fn add_versions(&self, group_id: &str, artifact_id: &str, versions: &[&str]) {
        let mut projects = self.projects.write().await;
        let project = projects
            .entry(ProjectCoordinate::new(group_id, artifact_id))
            .or_default();
        for version in versions {
            if !project.versions.iter().any(|v| v == version) {
                project.versions.push(version.to_string());
            }
        }
    }

    /// Declare the dependencies of one version
    pub async fn set_dependencies(&self, owner: &VersionKey, dependencies: Vec<VersionKey>) {
        let mut projects = self.projects.write().await;
        projects
            .entry(owner.coordinate())
            .or_default()
            .dependencies
            .insert(owner.version_id.clone(), dependencies.into_iter().collect());
    }

    /// Set the content files of one artifact type for a version
    pub async fn set_files(&self, owner: &VersionKey, artifact_type: ArtifactType, files: Vec<PathBuf>) {
        let mut projects = self.projects.write().await;
        projects
            .entry(owner.coordinate())
            .or_default()
            .files
            .insert((artifact_type, owner.version_id.clone()), files);
    }

    /// Set the declared build properties of a version
    pub async fn set_properties(&self, owner: &VersionKey, properties: &[(&str, &str)]) {
        let mut projects = self.projects.write().await;
        projects
            .entry(owner.coordinate())
            .or_default()
            .properties
            .insert(
                owner.version_id.clone(),
                properties
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            );
    }

    /// Make coordinate validation fail for a project
    pub async fn mark_invalid(&self, group_id: &str, artifact_id: &str) {
        self.invalid
            .write()
            .await
            .insert(ProjectCoordinate::new(group_id, artifact_id));
    }

    /// Make version listing fail for a project
    pub async fn mark_unreachable(&self, group_id: &str, artifact_id: &str) {
        self.unreachable
            .write()
            .await
            .insert(ProjectCoordinate::new(group_id, artifact_id));
    }

    /// Number of repository calls served so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn count_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ArtifactRepository for InMemoryRepository {
    async fn list_versions(&self, group_id: &str, artifact_id: &str) -> DepotResult<Vec<String>> {
        self.count_call();
        let coordinate = ProjectCoordinate::new(group_id, artifact_id);
        if self.unreachable.read().await.contains(&coordinate) {
            return Err(DepotError::repository(
                group_id,
                artifact_id,
                "upstream unreachable",
            ));
        }

        Ok(self
            .projects
            .read()
            .await
            .get(&coordinate)
            .map(|p| p.versions.clone())
            .unwrap_or_default())
    }

    async fn list_dependencies(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
    ) -> DepotResult<BTreeSet<VersionKey>> {
        self.count_call();
        Ok(self
            .projects
            .read()
            .await
            .get(&ProjectCoordinate::new(group_id, artifact_id))
            .and_then(|p| p.dependencies.get(version_id).cloned())
            .unwrap_or_default())
    }

    async fn list_files(
        &self,
        artifact_type: ArtifactType,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
    ) -> DepotResult<Vec<PathBuf>> {
        self.count_call();
        Ok(self
            .projects
            .read()
            .await
            .get(&ProjectCoordinate::new(group_id, artifact_id))
            .and_then(|p| p.files.get(&(artifact_type, version_id.to_string())).cloned())
            .unwrap_or_default())
    }

    async fn get_properties(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
    ) -> DepotResult<BTreeMap<String, String>> {
        self.count_call();
        Ok(self
            .projects
            .read()
            .await
            .get(&ProjectCoordinate::new(group_id, artifact_id))
            .and_then(|p| p.properties.get(version_id).cloned())
            .unwrap_or_default())
    }

    async fn are_valid_coordinates(&self, group_id: &str, artifact_id: &str) -> bool {
        self.count_call();
        !self
            .invalid
            .read()
            .await
            .contains(&ProjectCoordinate::new(group_id, artifact_id))
    }

    fn repository_name(&self) -> &'static str {
        "in-memory"
    }
}
