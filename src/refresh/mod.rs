//! Refresh orchestration engine
//!
//! [`ArtifactsRefreshService`] keeps the project cache in step with the
//! upstream repository. It decides what to refresh, guards every
//! project-version key against duplicate concurrent runs, ingests changed
//! content through the per-type handlers, walks dependency graphs, and
//! reconciles or retires cached versions.
//!
//! Every operation reports through a
//! [`MetadataEventResponse`](crate::domain::MetadataEventResponse):
//! recoverable failures accumulate on it and never abort sibling work. Only
//! store failures and direct lookups of unknown projects surface as `Err`.
//!
//! # Keys
//!
//! | Operation | Guard key |
//! |-----------|-----------|
//! | one version | `group-artifact-version` |
//! | all versions of a project | `group-artifact-all` |
//! | all versions, all projects | `all-all-all` |
//! | snapshot, all projects | `all-all-master-SNAPSHOT` |
//! | missing versions fix | `all-all-missing` |

mod dependencies;
mod discovery;
mod fanout;
mod guard;
mod pipeline;
pub mod properties;
mod reconcile;
mod retention;

pub use properties::PropertyFilter;

use crate::config::{Config, RefreshConfig};
use crate::domain::{ProjectData, VersionKey};
use crate::error::{DepotError, DepotResult};
use crate::handlers::HandlerRegistry;
use crate::repository::{ArtifactRepository, ArtifactType};
use crate::store::{DigestIndex, ProjectStore, QueryMetrics, RefreshStatusStore};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// External collaborators the engine composes
pub struct Collaborators {
    pub projects: Arc<dyn ProjectStore>,
    pub status: Arc<dyn RefreshStatusStore>,
    pub repository: Arc<dyn ArtifactRepository>,
    pub digests: Arc<dyn DigestIndex>,
    pub metrics: Arc<dyn QueryMetrics>,
    pub handlers: HandlerRegistry,
}

#[derive(Debug)]
struct Settings {
    artifact_types: Vec<ArtifactType>,
    properties: PropertyFilter,
    max_concurrent_projects: usize,
}

/// The refresh orchestrator
///
/// Cheap to clone; clones share collaborators.
#[derive(Clone)]
pub struct ArtifactsRefreshService {
    projects: Arc<dyn ProjectStore>,
    status: Arc<dyn RefreshStatusStore>,
    repository: Arc<dyn ArtifactRepository>,
    digests: Arc<dyn DigestIndex>,
    metrics: Arc<dyn QueryMetrics>,
    handlers: Arc<HandlerRegistry>,
    settings: Arc<Settings>,
}

impl ArtifactsRefreshService {
    /// Build the engine from its refresh settings
    ///
    /// Fails with `SettingsInvalid` for settings it cannot run with.
    pub fn new(collaborators: Collaborators, config: &RefreshConfig) -> DepotResult<Self> {
        config.validate()?;
        let settings = Settings {
            artifact_types: config.artifact_types.clone(),
            properties: PropertyFilter::new(&config.include_properties)?,
            max_concurrent_projects: config.max_concurrent_projects,
        };
        info!(
            "Refresh service using {} repository for {:?}",
            collaborators.repository.repository_name(),
            settings.artifact_types
        );

        Ok(Self {
            projects: collaborators.projects,
            status: collaborators.status,
            repository: collaborators.repository,
            digests: collaborators.digests,
            metrics: collaborators.metrics,
            handlers: Arc::new(collaborators.handlers),
            settings: Arc::new(settings),
        })
    }

    /// Build the engine from a whole configuration, as loaded by
    /// [`ConfigManager`](crate::config::ConfigManager)
    pub fn from_config(collaborators: Collaborators, config: &Config) -> DepotResult<Self> {
        config.validate()?;
        Self::new(collaborators, &config.refresh)
    }

    /// Artifact types ingested for every version
    pub fn artifact_types(&self) -> &[ArtifactType] {
        &self.settings.artifact_types
    }

    async fn all_projects(&self) -> DepotResult<Vec<ProjectData>> {
        let all = self.projects.list_all().await?;
        info!("[{}] projects found", all.len());
        Ok(all)
    }

    async fn require_project(&self, group_id: &str, artifact_id: &str) -> DepotResult<ProjectData> {
        self.projects
            .find(group_id, artifact_id)
            .await?
            .ok_or_else(|| DepotError::project_not_found(group_id, artifact_id))
    }
}

/// How far a version key got within one top-level operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Visit {
    InProgress,
    Refreshed,
    Failed,
}

/// State shared by every refresh started from one top-level operation
///
/// Records the outcome of each version key taken up, so that dependency
/// cycles and diamonds are walked once and a dependent never commits an
/// edge to a version whose refresh failed. `chain` holds the keys whose
/// dependency walk led to the current refresh and is private to each
/// branch of the walk.
#[derive(Debug, Clone)]
pub(crate) struct RefreshContext {
    full_update: bool,
    visits: Arc<Mutex<HashMap<VersionKey, Visit>>>,
    chain: Vec<VersionKey>,
}

impl RefreshContext {
    pub(crate) fn new(full_update: bool) -> Self {
        Self {
            full_update,
            visits: Arc::new(Mutex::new(HashMap::new())),
            chain: Vec::new(),
        }
    }

    pub(crate) fn full_update(&self) -> bool {
        self.full_update
    }

    fn visits(&self) -> MutexGuard<'_, HashMap<VersionKey, Visit>> {
        match self.visits.lock() {
            Ok(visits) => visits,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Take up a key; `None` if this caller is the first, else its state
    pub(crate) fn begin(&self, key: &VersionKey) -> Option<Visit> {
        match self.visits().entry(key.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(Visit::InProgress);
                None
            }
            Entry::Occupied(entry) => Some(*entry.get()),
        }
    }

    /// Record a finished refresh of `key`. A failure is never overwritten.
    pub(crate) fn finish(&self, key: &VersionKey, succeeded: bool) {
        let mut visits = self.visits();
        let state = visits.entry(key.clone()).or_insert(Visit::InProgress);
        if *state != Visit::Failed {
            *state = if succeeded { Visit::Refreshed } else { Visit::Failed };
        }
    }

    pub(crate) fn state(&self, key: &VersionKey) -> Option<Visit> {
        self.visits().get(key).copied()
    }

    /// Context for the dependencies of `owner`
    pub(crate) fn descend(&self, owner: &VersionKey) -> Self {
        let mut nested = self.clone();
        nested.chain.push(owner.clone());
        nested
    }

    /// Whether `key` is `owner` of this walk or one of its dependents
    pub(crate) fn on_chain(&self, key: &VersionKey) -> bool {
        self.chain.contains(key)
    }
}
