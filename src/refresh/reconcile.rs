//! Cache versus upstream reconciliation

use super::guard::refresh_error_message;
use super::{ArtifactsRefreshService, RefreshContext};
use crate::domain::{ErrorKind, MetadataEventResponse, VersionKey, VersionMismatch, MISSING};
use crate::error::DepotResult;
use tracing::{error, info};

impl ArtifactsRefreshService {
    /// Compare every cached project's versions with upstream
    ///
    /// Projects whose versions agree are left out. Fails on the first
    /// project upstream cannot list versions for.
    pub async fn find_version_mismatches(&self) -> DepotResult<Vec<VersionMismatch>> {
        let mut mismatches = Vec::new();
        for project in self.projects.list_all().await? {
            let upstream = self
                .repository
                .list_versions(&project.group_id, &project.artifact_id)
                .await
                .map_err(|e| {
                    error!(
                        "Could not get versions for {}:{} exception: {}",
                        project.group_id, project.artifact_id, e
                    );
                    e
                })?;

            if let Some(mismatch) = VersionMismatch::between(&project, upstream) {
                info!(
                    "version-mismatch found for {} {} {} : notInCache {:?}, notInRepo {:?}",
                    mismatch.project_id,
                    mismatch.group_id,
                    mismatch.artifact_id,
                    mismatch.versions_not_in_cache,
                    mismatch.versions_not_in_repo
                );
                mismatches.push(mismatch);
            }
        }
        Ok(mismatches)
    }

    /// Refresh every version upstream publishes that the cache is missing
    ///
    /// A failed fix is reported and the pass moves on to the next version.
    pub async fn fix_missing_versions(&self) -> DepotResult<MetadataEventResponse> {
        self.guarded(
            "fix_missing_versions",
            VersionKey::all_projects(MISSING),
            self.fix_missing(),
        )
        .await
    }

    async fn fix_missing(&self) -> DepotResult<MetadataEventResponse> {
        let mut response = MetadataEventResponse::new();
        let missing: Vec<VersionMismatch> = self
            .find_version_mismatches()
            .await?
            .into_iter()
            .filter(|m| !m.versions_not_in_cache.is_empty())
            .collect();
        info!("Starting fixing [{}] projects with missing versions", missing.len());

        let ctx = RefreshContext::new(false);
        let mut attempted = 0;
        let mut fixed = 0;
        for mismatch in &missing {
            for version_id in &mismatch.versions_not_in_cache {
                attempted += 1;
                let key = VersionKey::new(
                    mismatch.group_id.as_str(),
                    mismatch.artifact_id.as_str(),
                    version_id.as_str(),
                );
                let outcome = self
                    .refresh_version_checked(
                        &mismatch.group_id,
                        &mismatch.artifact_id,
                        version_id,
                        &ctx,
                    )
                    .await;

                match outcome {
                    Ok(refreshed) if !refreshed.has_errors() => {
                        fixed += 1;
                        let message = format!("fixed missing version: {}", key);
                        info!("{}", message);
                        response.merge(refreshed);
                        response.add_message(message);
                    }
                    other => {
                        let message = format!("fix failed for missing version: {}", key);
                        error!("{}", message);
                        match other {
                            Ok(refreshed) => {
                                response.merge(refreshed);
                            }
                            Err(e) => {
                                response.add_error(
                                    e.kind(),
                                    refresh_error_message(&key, &e.to_string()),
                                );
                            }
                        }
                        response.add_error(ErrorKind::Unexpected, message);
                    }
                }
            }
        }

        let summary = format!("Fixed [{}]/[{}] missing versions", fixed, attempted);
        info!("{}", summary);
        response.add_message(summary);
        Ok(response)
    }
}
