//! Parallel fan-out over projects
//!
//! One task per project, bounded by a semaphore. Each task produces its
//! own response; responses are reduced in input order once every task has
//! joined.

use super::ArtifactsRefreshService;
use crate::domain::{ErrorKind, MetadataEventResponse, ProjectData};
use crate::error::DepotResult;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

impl ArtifactsRefreshService {
    pub(crate) async fn fan_out<F, Fut>(
        &self,
        projects: Vec<ProjectData>,
        task: F,
    ) -> MetadataEventResponse
    where
        F: Fn(ArtifactsRefreshService, ProjectData) -> Fut,
        Fut: Future<Output = DepotResult<MetadataEventResponse>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_projects));
        let mut join_set = JoinSet::new();

        debug!(
            "Fanning out over {} projects, {} at a time",
            projects.len(),
            self.settings.max_concurrent_projects
        );

        for (index, project) in projects.into_iter().enumerate() {
            let coordinate = project.coordinate();
            let permit = Arc::clone(&semaphore);
            let work = task(self.clone(), project);

            join_set.spawn(async move {
                let _permit = permit.acquire_owned().await;
                let response = match work.await {
                    Ok(response) => response,
                    Err(e) => {
                        let message = format!("Error refreshing [{}] : {}", coordinate, e);
                        error!("{}", message);
                        let mut response = MetadataEventResponse::new();
                        response.add_error(e.kind(), message);
                        response
                    }
                };
                (index, response)
            });
        }

        let mut results = Vec::with_capacity(join_set.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    let message = format!("Refresh task failed: {}", e);
                    error!("{}", message);
                    let mut response = MetadataEventResponse::new();
                    response.add_error(ErrorKind::Unexpected, message);
                    results.push((usize::MAX, response));
                }
            }
        }

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, response)| response).collect()
    }
}
