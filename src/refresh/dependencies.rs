//! Dependency graph refresh
//!
//! Refreshes every upstream dependency of a version that is itself a cached
//! project, then replaces the version's dependency edges in one write. Edges
//! are only committed when every dependency resolved cleanly.

use super::{ArtifactsRefreshService, RefreshContext, Visit};
use crate::domain::{ErrorKind, MetadataEventResponse, ProjectVersionDependency, VersionKey};
use crate::error::DepotResult;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tracing::{debug, info, warn};

impl ArtifactsRefreshService {
    /// Refresh the dependencies of `owner` and commit its edges
    ///
    /// Boxed because dependency refreshes recurse back through the version
    /// pipeline.
    pub(crate) fn refresh_dependencies<'a>(
        &'a self,
        owner: VersionKey,
        ctx: &'a RefreshContext,
    ) -> BoxFuture<'a, DepotResult<MetadataEventResponse>> {
        async move {
            let ctx = ctx.descend(&owner);
            let mut response = MetadataEventResponse::new();
            if self
                .projects
                .find(&owner.group_id, &owner.artifact_id)
                .await?
                .is_none()
            {
                response.add_error(
                    ErrorKind::NotFound,
                    format!("No project found: [{}]", owner.coordinate()),
                );
                return Ok(response);
            }

            let upstream = self
                .repository
                .list_dependencies(&owner.group_id, &owner.artifact_id, &owner.version_id)
                .await?;
            debug!("[{}] has {} upstream dependencies", owner, upstream.len());

            let mut staged = Vec::with_capacity(upstream.len());
            for dependency in upstream {
                let cached = self
                    .projects
                    .find(&dependency.group_id, &dependency.artifact_id)
                    .await?;
                if cached.is_none() {
                    response.add_error(
                        ErrorKind::NotFound,
                        format!("Could not find dependent project: [{}]", dependency),
                    );
                    continue;
                }

                response.add_message(format!("Processing dependency [{}] -> [{}]", owner, dependency));
                if self
                    .settle_dependency(&owner, &dependency, &ctx, &mut response)
                    .await?
                {
                    staged.push(ProjectVersionDependency::new(owner.clone(), dependency));
                }
            }

            if response.has_errors() {
                warn!("Dependencies of [{}] not updated due to errors", owner);
                return Ok(response);
            }

            let Some(mut latest) = self
                .projects
                .find(&owner.group_id, &owner.artifact_id)
                .await?
            else {
                response.add_error(
                    ErrorKind::NotFound,
                    format!("No project found: [{}]", owner.coordinate()),
                );
                return Ok(response);
            };
            let count = staged.len();
            if latest.dependencies(&owner.version_id) != staged.as_slice() {
                latest.replace_dependencies(&owner.version_id, staged);
                self.projects.upsert(&latest).await?;
            }
            info!("Finished updating {} dependencies for [{}]", count, owner);
            Ok(response)
        }
        .boxed()
    }

    /// Bring `dependency` up to date within `ctx`; true once its edge can
    /// be staged
    ///
    /// A dependency that leads back to `owner` is staged as is. One refreshed
    /// by another branch of the same operation is staged only if that
    /// refresh succeeded.
    async fn settle_dependency(
        &self,
        owner: &VersionKey,
        dependency: &VersionKey,
        ctx: &RefreshContext,
        response: &mut MetadataEventResponse,
    ) -> DepotResult<bool> {
        if ctx.on_chain(dependency) {
            debug!("[{}] depends back on [{}], not followed", owner, dependency);
            return Ok(true);
        }

        let mut reported = false;
        if ctx.begin(dependency).is_none() {
            match self
                .refresh_version_checked(
                    &dependency.group_id,
                    &dependency.artifact_id,
                    &dependency.version_id,
                    ctx,
                )
                .await
            {
                Ok(nested) => {
                    reported = nested.has_errors();
                    response.merge(nested);
                }
                Err(e) => {
                    reported = true;
                    response.add_error(
                        e.kind(),
                        format!("Error refreshing dependency [{}] : {}", dependency, e),
                    );
                }
            }
            if reported {
                ctx.finish(dependency, false);
            }
        } else {
            debug!("[{}] already taken up in this refresh", dependency);
        }

        let settled = match ctx.state(dependency) {
            Some(Visit::Refreshed) => true,
            _ if reported => false,
            Some(Visit::Failed) => {
                response.add_error(
                    ErrorKind::Unexpected,
                    format!(
                        "Dependency [{}] failed to refresh, dependencies of [{}] not updated",
                        dependency, owner
                    ),
                );
                false
            }
            Some(Visit::InProgress) | None => {
                response.add_error(
                    ErrorKind::Unexpected,
                    format!(
                        "Dependency [{}] is still refreshing, dependencies of [{}] not updated",
                        dependency, owner
                    ),
                );
                false
            }
        };
        Ok(settled)
    }
}
