//! Per-key refresh run state

use crate::domain::coordinate::VersionKey;
use crate::domain::response::MetadataEventResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Run state of one refresh key
///
/// The key is a real project version or a batch sentinel such as
/// `all-all-all`. `response` holds the outcome of the last finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshStatus {
    pub key: VersionKey,

    pub running: bool,

    /// Identifies the run currently (or last) holding the key
    pub run_id: Option<Uuid>,

    pub started_at: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,

    pub response: MetadataEventResponse,
}

impl RefreshStatus {
    /// Idle status for a key that has never run
    pub fn new(key: VersionKey) -> Self {
        Self {
            key,
            running: false,
            run_id: None,
            started_at: None,
            updated_at: Utc::now(),
            response: MetadataEventResponse::new(),
        }
    }

    /// Transition to running under a fresh run id
    pub fn start_running(mut self) -> Self {
        let now = Utc::now();
        self.running = true;
        self.run_id = Some(Uuid::new_v4());
        self.started_at = Some(now);
        self.updated_at = now;
        self
    }

    /// Transition to idle, recording the run's outcome
    pub fn stop_running(mut self, response: MetadataEventResponse) -> Self {
        self.running = false;
        self.updated_at = Utc::now();
        self.response = response;
        self
    }
}
