//! Version deletion and retention

use super::ArtifactsRefreshService;
use crate::config::RetentionConfig;
use crate::domain::{MetadataEventResponse, ProjectData};
use crate::error::DepotResult;
use chrono::{Duration, Utc};
use tracing::{debug, error, info};

impl ArtifactsRefreshService {
    /// Remove a version's artifacts and drop it from the project
    ///
    /// Deleting a version the project no longer knows only rewrites the
    /// project.
    pub async fn delete(&self, group_id: &str, artifact_id: &str, version_id: &str) -> DepotResult<()> {
        let mut project = self.require_project(group_id, artifact_id).await?;

        for artifact_type in &self.settings.artifact_types {
            match self.handlers.get(*artifact_type) {
                Some(handler) => handler.delete(group_id, artifact_id, version_id).await?,
                None => debug!("No {} handler, nothing to delete", artifact_type),
            }
        }

        project.remove_version(version_id);
        self.projects.upsert(&project).await?;
        info!(
            "Deleted [{}]",
            project.coordinate().version(version_id)
        );
        Ok(())
    }

    /// Keep only the newest `versions_to_keep` versions of every project
    pub async fn retire_old_versions(&self, versions_to_keep: usize) -> DepotResult<MetadataEventResponse> {
        info!("Start purging versions for all projects");
        let projects = self.all_projects().await?;
        let total = projects.len();

        let mut response = self
            .fan_out(projects, move |service, project| async move {
                service.purge_project_versions(project, versions_to_keep).await
            })
            .await;
        response.add_message(format!("Total {} projects", total));

        info!("Finished purging versions for all projects");
        log_errors(&response);
        Ok(response)
    }

    /// Retire versions not queried for more than `days` days
    ///
    /// Versions never observed are kept, as is the newest version of each
    /// project.
    pub async fn retire_least_recently_used_versions(
        &self,
        days: u32,
    ) -> DepotResult<MetadataEventResponse> {
        info!("Start retiring versions unused for {} days", days);
        let projects = self.all_projects().await?;
        let total = projects.len();

        let mut response = self
            .fan_out(projects, move |service, project| async move {
                service.retire_unused_project_versions(project, days).await
            })
            .await;
        response.add_message(format!("Total {} projects", total));

        info!("Finished retiring unused versions");
        log_errors(&response);
        Ok(response)
    }

    /// Apply both retention rules; age-based retirement only when enabled
    pub async fn apply_retention(&self, retention: &RetentionConfig) -> DepotResult<MetadataEventResponse> {
        let mut response = self.retire_old_versions(retention.versions_to_keep).await?;
        if retention.unused_days > 0 {
            response.merge(
                self.retire_least_recently_used_versions(retention.unused_days)
                    .await?,
            );
        }
        Ok(response)
    }

    async fn purge_project_versions(
        &self,
        project: ProjectData,
        versions_to_keep: usize,
    ) -> DepotResult<MetadataEventResponse> {
        let versions = project.versions();
        let excess = versions.len().saturating_sub(versions_to_keep);

        // Oldest first
        for version_id in &versions[..excess] {
            self.delete(&project.group_id, &project.artifact_id, version_id)
                .await?;
        }

        let mut response = MetadataEventResponse::new();
        response.add_message(format!("{} purged {} version", project.project_id, excess));
        Ok(response)
    }

    async fn retire_unused_project_versions(
        &self,
        project: ProjectData,
        days: u32,
    ) -> DepotResult<MetadataEventResponse> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        let latest = project.latest_version();

        let mut retired = 0;
        for version_id in project.versions() {
            if Some(version_id.as_str()) == latest {
                continue;
            }
            let key = project.coordinate().version(version_id.as_str());
            match self.metrics.last_used(&key).await? {
                Some(last_used) if last_used < cutoff => {
                    debug!("[{}] last used {}", key, last_used);
                    self.delete(&project.group_id, &project.artifact_id, version_id)
                        .await?;
                    retired += 1;
                }
                _ => {}
            }
        }

        let mut response = MetadataEventResponse::new();
        response.add_message(format!("{} retired {} unused version", project.project_id, retired));
        Ok(response)
    }
}

fn log_errors(response: &MetadataEventResponse) {
    if response.has_errors() {
        error!("{}", response.error_messages().join(",\n"));
    }
}
