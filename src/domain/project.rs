//! Project aggregate

use crate::domain::coordinate::{ProjectCoordinate, VersionKey};
use crate::domain::version::{compare_versions, sort_versions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A build property declared by one version of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectProperty {
    pub name: String,
    pub value: String,
    pub version_id: String,
}

impl ProjectProperty {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            version_id: version_id.into(),
        }
    }
}

/// Directed edge: (project, version) -> (dependency project, dependency version)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectVersionDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version_id: String,
    pub dependency: VersionKey,
}

impl ProjectVersionDependency {
    pub fn new(owner: VersionKey, dependency: VersionKey) -> Self {
        Self {
            group_id: owner.group_id,
            artifact_id: owner.artifact_id,
            version_id: owner.version_id,
            dependency,
        }
    }
}

/// Cached state of one project
///
/// Known versions are kept unique and sorted ascending under the version
/// ordering, including when read back from a store. Properties and
/// dependency edges are indexed by version id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredProject")]
pub struct ProjectData {
    /// Application-level project identifier
    pub project_id: String,

    pub group_id: String,

    pub artifact_id: String,

    versions: Vec<String>,

    properties: BTreeMap<String, Vec<ProjectProperty>>,

    dependencies: BTreeMap<String, Vec<ProjectVersionDependency>>,
}

/// Serialized form of [`ProjectData`], in whatever order a store kept it
#[derive(Deserialize)]
struct StoredProject {
    project_id: String,
    group_id: String,
    artifact_id: String,
    #[serde(default)]
    versions: Vec<String>,
    #[serde(default)]
    properties: BTreeMap<String, Vec<ProjectProperty>>,
    #[serde(default)]
    dependencies: BTreeMap<String, Vec<ProjectVersionDependency>>,
}

impl From<StoredProject> for ProjectData {
    fn from(stored: StoredProject) -> Self {
        let mut project = Self {
            project_id: stored.project_id,
            group_id: stored.group_id,
            artifact_id: stored.artifact_id,
            versions: stored.versions,
            properties: stored.properties,
            dependencies: stored.dependencies,
        };
        project.normalize();
        project
    }
}

impl ProjectData {
    /// Create a project with no known versions
    pub fn new(
        project_id: impl Into<String>,
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            versions: Vec::new(),
            properties: BTreeMap::new(),
            dependencies: BTreeMap::new(),
        }
    }

    pub fn coordinate(&self) -> ProjectCoordinate {
        ProjectCoordinate::new(self.group_id.clone(), self.artifact_id.clone())
    }

    /// Known versions, oldest first
    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    pub fn has_version(&self, version_id: &str) -> bool {
        self.versions.iter().any(|v| v == version_id)
    }

    /// Add a known version; no-op if already present
    pub fn add_version(&mut self, version_id: &str) {
        if self.has_version(version_id) {
            return;
        }
        let position = self
            .versions
            .partition_point(|v| compare_versions(v, version_id).is_lt());
        self.versions.insert(position, version_id.to_string());
    }

    /// Remove a version together with its properties and dependency edges
    pub fn remove_version(&mut self, version_id: &str) {
        self.versions.retain(|v| v != version_id);
        self.properties.remove(version_id);
        self.dependencies.remove(version_id);
    }

    /// The highest known version, if any
    pub fn latest_version(&self) -> Option<&str> {
        self.versions.last().map(String::as_str)
    }

    pub fn properties(&self, version_id: &str) -> &[ProjectProperty] {
        self.properties
            .get(version_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Merge properties into their versions, replacing same-named entries
    pub fn add_properties(&mut self, properties: Vec<ProjectProperty>) {
        for property in properties {
            let entries = self
                .properties
                .entry(property.version_id.clone())
                .or_default();
            match entries.iter_mut().find(|p| p.name == property.name) {
                Some(existing) => *existing = property,
                None => entries.push(property),
            }
        }
    }

    pub fn dependencies(&self, version_id: &str) -> &[ProjectVersionDependency] {
        self.dependencies
            .get(version_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Replace the whole edge set of one version
    pub fn replace_dependencies(
        &mut self,
        version_id: &str,
        dependencies: Vec<ProjectVersionDependency>,
    ) {
        if dependencies.is_empty() {
            self.dependencies.remove(version_id);
        } else {
            self.dependencies.insert(version_id.to_string(), dependencies);
        }
    }

    fn normalize(&mut self) {
        sort_versions(&mut self.versions);
        self.versions.dedup();
    }
}
