//! Top-level refresh entry points and version discovery

use super::{ArtifactsRefreshService, RefreshContext};
use crate::domain::{
    is_snapshot, sort_versions, ErrorKind, MetadataEventResponse, ProjectData, VersionKey, ALL,
    MASTER_SNAPSHOT,
};
use crate::error::{DepotError, DepotResult};
use tracing::{info, warn};

impl ArtifactsRefreshService {
    /// Refresh a single version of a known project
    ///
    /// Fails with `ProjectNotFound` for an unknown project, and with the
    /// repository error when upstream versions cannot be listed. A version
    /// upstream does not publish is reported on the response.
    pub async fn refresh_version(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
        full_update: bool,
    ) -> DepotResult<MetadataEventResponse> {
        self.require_project(group_id, artifact_id).await?;
        self.refresh_version_checked(
            group_id,
            artifact_id,
            version_id,
            &RefreshContext::new(full_update),
        )
        .await
    }

    /// Refresh every upstream version of a known project, then its snapshot
    pub async fn refresh_all_versions_for_project(
        &self,
        group_id: &str,
        artifact_id: &str,
        full_update: bool,
    ) -> DepotResult<MetadataEventResponse> {
        let project = self.require_project(group_id, artifact_id).await?;
        let ctx = RefreshContext::new(full_update);

        let response = self.all_versions_for_project(&project, &ctx).await?;
        let snapshot = self
            .refresh_project_version(&project, MASTER_SNAPSHOT, &ctx)
            .await?;
        Ok(response.combine(snapshot))
    }

    /// Refresh the snapshot pseudo-version of every known project
    pub async fn refresh_master_snapshot_for_all_projects(
        &self,
        full_update: bool,
    ) -> DepotResult<MetadataEventResponse> {
        self.guarded(
            "refresh_master_snapshot_for_all_projects",
            VersionKey::all_projects(MASTER_SNAPSHOT),
            async {
                let ctx = RefreshContext::new(full_update);
                let projects = self.all_projects().await?;
                Ok::<_, DepotError>(self
                    .fan_out(projects, move |service, project| {
                        let ctx = ctx.clone();
                        async move {
                            service
                                .refresh_project_version(&project, MASTER_SNAPSHOT, &ctx)
                                .await
                        }
                    })
                    .await)
            },
        )
        .await
    }

    /// Refresh every upstream version of every known project
    pub async fn refresh_all_versions_for_all_projects(
        &self,
        full_update: bool,
    ) -> DepotResult<MetadataEventResponse> {
        self.guarded(
            "refresh_all_versions_for_all_projects",
            VersionKey::all_projects(ALL),
            async {
                let ctx = RefreshContext::new(full_update);
                let projects = self.all_projects().await?;
                Ok::<_, DepotError>(self
                    .fan_out(projects, move |service, project| {
                        let ctx = ctx.clone();
                        async move { service.all_versions_for_project(&project, &ctx).await }
                    })
                    .await)
            },
        )
        .await
    }

    /// Refresh one version, reporting unknown projects and unpublished
    /// versions on the response
    ///
    /// A version already running is skipped before upstream is asked for
    /// its versions.
    pub(crate) async fn refresh_version_checked(
        &self,
        group_id: &str,
        artifact_id: &str,
        version_id: &str,
        ctx: &RefreshContext,
    ) -> DepotResult<MetadataEventResponse> {
        let mut response = MetadataEventResponse::new();
        let key = VersionKey::new(group_id, artifact_id, version_id);
        if self.status.get(&key).await?.running {
            info!("Other instance is running, skipping [{}] refresh", key);
            return Ok(response);
        }

        let Some(project) = self.projects.find(group_id, artifact_id).await? else {
            response.add_error(
                ErrorKind::NotFound,
                format!("Project does not exists for {}-{}", group_id, artifact_id),
            );
            return Ok(response);
        };

        if !is_snapshot(version_id) {
            let upstream = self.repository.list_versions(group_id, artifact_id).await?;
            if !upstream.iter().any(|v| v == version_id) {
                response.add_error(
                    ErrorKind::Validation,
                    format!(
                        "Version {} does not exists for {}-{}",
                        version_id, group_id, artifact_id
                    ),
                );
                return Ok(response);
            }
        }

        self.refresh_project_version(&project, version_id, ctx).await
    }

    /// Refresh the versions upstream has and the cache is missing
    ///
    /// With `full_update` every upstream version is refreshed.
    pub(crate) async fn all_versions_for_project(
        &self,
        project: &ProjectData,
        ctx: &RefreshContext,
    ) -> DepotResult<MetadataEventResponse> {
        self.guarded(
            "refresh_all_versions_for_project",
            project.coordinate().version(ALL),
            self.discover_versions(project, ctx),
        )
        .await
    }

    async fn discover_versions(
        &self,
        project: &ProjectData,
        ctx: &RefreshContext,
    ) -> DepotResult<MetadataEventResponse> {
        let mut response = MetadataEventResponse::new();
        let label = format!("{}: [{}]", project.project_id, project.coordinate());

        if !self
            .repository
            .are_valid_coordinates(&project.group_id, &project.artifact_id)
            .await
        {
            let message = format!(
                "{} invalid project settings {}: [{}] versions not refreshed",
                project.project_id,
                project.project_id,
                project.coordinate()
            );
            warn!("{}", message);
            response.add_error(ErrorKind::Validation, message);
            return Ok(response);
        }

        info!("Fetching {} versions", label);
        let upstream = match self
            .repository
            .list_versions(&project.group_id, &project.artifact_id)
            .await
        {
            Ok(upstream) => upstream,
            Err(e) => {
                response.add_error(e.kind(), e.to_string());
                return Ok(response);
            }
        };

        let mut to_refresh: Vec<String> = if ctx.full_update() {
            upstream
        } else {
            upstream
                .into_iter()
                .filter(|v| !project.has_version(v))
                .collect()
        };
        if to_refresh.is_empty() {
            return Ok(response);
        }
        sort_versions(&mut to_refresh);

        info!(
            "{} found [{}] new versions: {:?}",
            label,
            to_refresh.len(),
            to_refresh
        );
        for version_id in &to_refresh {
            response.merge(self.refresh_project_version(project, version_id, ctx).await?);
        }
        response.add_message(format!("{} found [{}] new versions", label, to_refresh.len()));
        Ok(response)
    }
}
