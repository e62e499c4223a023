//! Cache versus upstream version discrepancies

use crate::domain::project::ProjectData;
use crate::domain::version::sort_versions;
use serde::{Deserialize, Serialize};

/// Versions that differ between the cache and the upstream repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMismatch {
    pub project_id: String,
    pub group_id: String,
    pub artifact_id: String,
    /// Present upstream, absent from the cached project
    pub versions_not_in_cache: Vec<String>,
    /// Present in the cached project, absent upstream
    pub versions_not_in_repo: Vec<String>,
}

impl VersionMismatch {
    /// Compare a cached project with upstream's version list
    ///
    /// Returns `None` when both sides agree.
    pub fn between(project: &ProjectData, mut upstream: Vec<String>) -> Option<Self> {
        sort_versions(&mut upstream);

        let versions_not_in_cache: Vec<String> = upstream
            .iter()
            .filter(|v| !project.has_version(v))
            .cloned()
            .collect();
        let versions_not_in_repo: Vec<String> = project
            .versions()
            .iter()
            .filter(|v| !upstream.contains(v))
            .cloned()
            .collect();

        if versions_not_in_cache.is_empty() && versions_not_in_repo.is_empty() {
            return None;
        }

        Some(Self {
            project_id: project.project_id.clone(),
            group_id: project.group_id.clone(),
            artifact_id: project.artifact_id.clone(),
            versions_not_in_cache,
            versions_not_in_repo,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cached(versions: &[&str]) -> ProjectData {
        let mut p = ProjectData::new("PROD-1", "org.finos", "model");
        for v in versions {
            p.add_version(v);
        }
        p
    }

    fn strings(versions: &[&str]) -> Vec<String> {
        versions.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn detects_both_directions() {
        let mismatch =
            VersionMismatch::between(&cached(&["1.0", "1.1"]), strings(&["1.2", "1.1"])).unwrap();

        assert_eq!(mismatch.versions_not_in_cache, vec!["1.2"]);
        assert_eq!(mismatch.versions_not_in_repo, vec!["1.0"]);
        assert_eq!(mismatch.project_id, "PROD-1");
    }

    #[test]
    fn upstream_order_is_sorted() {
        let mismatch =
            VersionMismatch::between(&cached(&[]), strings(&["2.0.0", "1.10.0", "1.2.0"]))
                .unwrap();
        assert_eq!(
            mismatch.versions_not_in_cache,
            vec!["1.2.0", "1.10.0", "2.0.0"]
        );
    }

    #[test]
    fn agreement_yields_none() {
        assert!(VersionMismatch::between(&cached(&["1.0"]), strings(&["1.0"])).is_none());
    }
}
