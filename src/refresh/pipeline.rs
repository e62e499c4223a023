//! Single-version refresh pipeline
//!
//! Content ingestion per artifact type, then (only if every type ingested
//! cleanly) the metrics observation, project aggregate update, property
//! merge and dependency graph refresh, strictly in that order.

use super::{ArtifactsRefreshService, RefreshContext};
use crate::digest;
use crate::domain::{is_snapshot, ErrorKind, MetadataEventResponse, ProjectData};
use crate::error::DepotResult;
use crate::repository::ArtifactType;
use tracing::{debug, info, warn};

impl ArtifactsRefreshService {
    /// Refresh one version of a cached project under its run guard
    pub(crate) async fn refresh_project_version(
        &self,
        project: &ProjectData,
        version_id: &str,
        ctx: &RefreshContext,
    ) -> DepotResult<MetadataEventResponse> {
        let key = project.coordinate().version(version_id);
        ctx.begin(&key);
        let outcome = self
            .try_guarded(
                "refresh_project_version",
                key.clone(),
                self.version_pipeline(project, version_id, ctx),
            )
            .await?;

        // Only the run that held the guard knows how it went
        match outcome {
            Some(response) => {
                ctx.finish(&key, !response.has_errors());
                Ok(response)
            }
            None => Ok(MetadataEventResponse::new()),
        }
    }

    async fn version_pipeline(
        &self,
        project: &ProjectData,
        version_id: &str,
        ctx: &RefreshContext,
    ) -> DepotResult<MetadataEventResponse> {
        let mut response = MetadataEventResponse::new();
        for artifact_type in &self.settings.artifact_types {
            response.merge(
                self.refresh_artifact_type(*artifact_type, project, version_id, ctx.full_update())
                    .await?,
            );
        }

        if response.has_errors() {
            warn!(
                "Refresh of [{}] had errors, project left unchanged",
                project.coordinate().version(version_id)
            );
            return Ok(response);
        }

        let key = project.coordinate().version(version_id);
        self.metrics.record(&key).await?;

        // Re-read so concurrent updates to the aggregate are not lost
        let Some(mut latest) = self
            .projects
            .find(&project.group_id, &project.artifact_id)
            .await?
        else {
            warn!("Project [{}] disappeared during refresh", project.coordinate());
            return Ok(response);
        };

        if !is_snapshot(version_id) {
            latest.add_version(version_id);
        }
        let upstream = self
            .repository
            .get_properties(&project.group_id, &project.artifact_id, version_id)
            .await?;
        latest.add_properties(self.settings.properties.select(version_id, &upstream));
        self.projects.upsert(&latest).await?;

        response.merge(self.refresh_dependencies(key, ctx).await?);
        Ok(response)
    }

    async fn refresh_artifact_type(
        &self,
        artifact_type: ArtifactType,
        project: &ProjectData,
        version_id: &str,
        full_update: bool,
    ) -> DepotResult<MetadataEventResponse> {
        let mut response = MetadataEventResponse::new();
        let Some(handler) = self.handlers.get(artifact_type) else {
            response.add_error(
                ErrorKind::Content,
                format!(
                    "handler not found for artifact type {}, please check your configuration",
                    artifact_type
                ),
            );
            return Ok(response);
        };

        let candidates = self
            .repository
            .list_files(
                artifact_type,
                &project.group_id,
                &project.artifact_id,
                version_id,
            )
            .await?;
        let selected = digest::select_files(&*self.digests, candidates, full_update).await?;
        if selected.is_empty() {
            debug!(
                "No changed {} files for [{}]",
                artifact_type,
                project.coordinate().version(version_id)
            );
            return Ok(response);
        }

        let files: Vec<_> = selected.iter().map(|f| f.path.clone()).collect();
        info!(
            "Ingesting {} {} files for [{}]",
            files.len(),
            artifact_type,
            project.coordinate().version(version_id)
        );
        let ingested = handler.ingest(project, version_id, &files).await?;
        if !ingested.has_errors() {
            digest::record_digests(&*self.digests, &selected).await?;
        }

        response.merge(ingested);
        Ok(response)
    }
}
