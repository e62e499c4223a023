//! Upstream artifact repository abstraction
//!
//! The upstream repository is the source of truth for which versions of a
//! project exist, what each version depends on, its build properties and
//! the content files of every artifact type.

pub mod memory;

pub use memory::InMemoryRepository;

use crate::domain::VersionKey;
use crate::error::DepotResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Kinds of derived artifact ingested per project version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactType {
    /// Model entities
    Entities,
    /// Entities rewritten under a versioned package
    VersionedEntities,
    /// Generated files derived from entities
    FileGenerations,
}

impl ArtifactType {
    /// All artifact types in ingestion order
    pub fn all() -> &'static [Self] {
        &[
            Self::Entities,
            Self::VersionedEntities,
            Self::FileGenerations,
        ]
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Entities => "entities",
            Self::VersionedEntities => "versioned-entities",
            Self::FileGenerations => "file-generations",
        };
        write!(f, "{}", name)
    }
}

/// Read-only view of the upstream repository
///
/// Implementations wrap whatever transport reaches the real repository;
/// [`InMemoryRepository`] serves tests and embedding.
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Versions published for a project
    ///
    /// Fails for invalid coordinates or an unreachable upstream.
    async fn list_versions(&self, group_id: &str, artifact_id: &str) -> DepotResult<Vec<String>>;

    /// Declared dependencies of one project version
    async fn list_dependencies(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
    ) -> DepotResult<BTreeSet<VersionKey>>;

    /// Content files of one artifact type for a project version
    async fn list_files(
        &self,
        artifact_type: ArtifactType,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
    ) -> DepotResult<Vec<PathBuf>>;

    /// Declared build properties of a project version
    async fn get_properties(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
    ) -> DepotResult<BTreeMap<String, String>>;

    /// Whether the coordinates are acceptable to the repository
    async fn are_valid_coordinates(&self, group_id: &str, artifact_id: &str) -> bool;

    /// Human-readable repository name for logs
    fn repository_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_type_display() {
        assert_eq!(ArtifactType::Entities.to_string(), "entities");
        assert_eq!(
            ArtifactType::VersionedEntities.to_string(),
            "versioned-entities"
        );
    }

    #[test]
    fn artifact_type_serde_matches_display() {
        for artifact_type in ArtifactType::all() {
            let json = serde_json::to_string(artifact_type).unwrap();
            assert_eq!(json, format!("\"{}\"", artifact_type));
        }
    }
}
