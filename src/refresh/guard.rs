//! Run-guarded refresh envelope
//!
//! At most one run per key is recorded as running. The key is claimed
//! with an atomic conditional start; a claimed key is always released with
//! the run's outcome, whether the unit of work returned, failed or panicked.

use super::ArtifactsRefreshService;
use crate::domain::{ErrorKind, MetadataEventResponse, VersionKey};
use crate::error::DepotResult;
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{error, info, info_span, Instrument};

pub(crate) fn refresh_error_message(key: &VersionKey, cause: &str) -> String {
    format!("Error refreshing [{}] : {}", key, cause)
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panicked".to_string()
    }
}

impl ArtifactsRefreshService {
    /// Run `work` under the run guard of `key`
    ///
    /// Returns an empty response without polling `work` when the key is
    /// already running. Errors and panics inside `work` become a soft
    /// error on the returned response. Only status store failures are
    /// returned as `Err`.
    pub(crate) async fn guarded<Fut>(
        &self,
        label: &'static str,
        key: VersionKey,
        work: Fut,
    ) -> DepotResult<MetadataEventResponse>
    where
        Fut: Future<Output = DepotResult<MetadataEventResponse>>,
    {
        Ok(self
            .try_guarded(label, key, work)
            .await?
            .unwrap_or_else(MetadataEventResponse::new))
    }

    /// Like [`guarded`](Self::guarded), but `None` when the key was already
    /// running and `work` was skipped
    pub(crate) async fn try_guarded<Fut>(
        &self,
        label: &'static str,
        key: VersionKey,
        work: Fut,
    ) -> DepotResult<Option<MetadataEventResponse>>
    where
        Fut: Future<Output = DepotResult<MetadataEventResponse>>,
    {
        let span = info_span!(
            "refresh",
            label,
            group_id = %key.group_id,
            artifact_id = %key.artifact_id,
            version_id = %key.version_id
        );
        self.run_guarded(key, work).instrument(span).await
    }

    async fn run_guarded<Fut>(
        &self,
        key: VersionKey,
        work: Fut,
    ) -> DepotResult<Option<MetadataEventResponse>>
    where
        Fut: Future<Output = DepotResult<MetadataEventResponse>>,
    {
        info!("Starting [{}] refresh", key);
        let Some(status) = self.status.try_start(&key).await? else {
            info!("Other instance is running, skipping [{}] refresh", key);
            return Ok(None);
        };

        let response = match AssertUnwindSafe(work).catch_unwind().await {
            Ok(Ok(response)) => {
                info!("Finished [{}] refresh", key);
                response
            }
            Ok(Err(e)) => {
                let message = refresh_error_message(&key, &e.to_string());
                error!("{}", message);
                let mut response = MetadataEventResponse::new();
                response.add_error(e.kind(), message);
                response
            }
            Err(payload) => {
                let message = refresh_error_message(&key, &panic_message(payload.as_ref()));
                error!("{}", message);
                let mut response = MetadataEventResponse::new();
                response.add_error(ErrorKind::Unexpected, message);
                response
            }
        };

        self.status
            .upsert(&status.stop_running(response.clone()))
            .await?;
        Ok(Some(response))
    }
}
