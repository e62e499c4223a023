//! Project and version coordinates

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel version (and group/artifact) for batch operations over everything
pub const ALL: &str = "all";

/// Sentinel version for the missing-versions reconciliation pass
pub const MISSING: &str = "missing";

/// The unversioned, continuously moving snapshot pseudo-version
pub const MASTER_SNAPSHOT: &str = "master-SNAPSHOT";

/// Unique key of a project: (groupId, artifactId)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectCoordinate {
    pub group_id: String,
    pub artifact_id: String,
}

impl ProjectCoordinate {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }

    /// Key for one version of this project
    pub fn version(&self, version_id: impl Into<String>) -> VersionKey {
        VersionKey {
            group_id: self.group_id.clone(),
            artifact_id: self.artifact_id.clone(),
            version_id: version_id.into(),
        }
    }
}

impl fmt::Display for ProjectCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.group_id, self.artifact_id)
    }
}

/// (groupId, artifactId, versionId) triple
///
/// Used both for real project versions and for the batch sentinels
/// ([`ALL`], [`MISSING`]) that key run-guard status records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionKey {
    pub group_id: String,
    pub artifact_id: String,
    pub version_id: String,
}

impl VersionKey {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version_id: version_id.into(),
        }
    }

    /// Key for a batch operation spanning every project
    pub fn all_projects(version_id: &str) -> Self {
        Self::new(ALL, ALL, version_id)
    }

    pub fn coordinate(&self) -> ProjectCoordinate {
        ProjectCoordinate::new(self.group_id.clone(), self.artifact_id.clone())
    }
}

impl fmt::Display for VersionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.group_id, self.artifact_id, self.version_id)
    }
}
