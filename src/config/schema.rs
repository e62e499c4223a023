//! Configuration schema for depot-refresh
//!
//! Configuration is stored at `~/.config/depot-refresh/config.toml`

use crate::error::{DepotError, DepotResult};
use crate::refresh::PropertyFilter;
use crate::repository::ArtifactType;
use serde::{Deserialize, Serialize};

/// Log formats understood by [`telemetry::init`](crate::telemetry::init)
pub const LOG_FORMATS: [&str; 2] = ["text", "json"];

fn invalid(reason: String) -> DepotError {
    DepotError::SettingsInvalid(reason)
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Refresh pipeline settings
    pub refresh: RefreshConfig,

    /// Version retention settings
    pub retention: RetentionConfig,
}

impl Config {
    /// Reject settings that parse but cannot drive the engine
    pub fn validate(&self) -> DepotResult<()> {
        self.general.validate()?;
        self.refresh.validate()?;
        self.retention.validate()
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

impl GeneralConfig {
    pub fn validate(&self) -> DepotResult<()> {
        if !LOG_FORMATS.contains(&self.log_format.as_str()) {
            return Err(invalid(format!(
                "general.log_format '{}' is not one of {:?}",
                self.log_format, LOG_FORMATS
            )));
        }
        Ok(())
    }
}

/// Refresh pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Artifact types ingested for every version, in order
    pub artifact_types: Vec<ArtifactType>,

    /// Upstream properties kept on a version: exact names or full-match regexes
    pub include_properties: Vec<String>,

    /// Projects refreshed in parallel by batch operations
    pub max_concurrent_projects: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            artifact_types: ArtifactType::all().to_vec(),
            include_properties: vec![],
            max_concurrent_projects: 8,
        }
    }
}

impl RefreshConfig {
    pub fn validate(&self) -> DepotResult<()> {
        if self.artifact_types.is_empty() {
            return Err(invalid(
                "refresh.artifact_types must name at least one artifact type".to_string(),
            ));
        }
        for (i, artifact_type) in self.artifact_types.iter().enumerate() {
            if self.artifact_types[..i].contains(artifact_type) {
                return Err(invalid(format!(
                    "refresh.artifact_types lists {} more than once",
                    artifact_type
                )));
            }
        }
        if self.max_concurrent_projects == 0 {
            return Err(invalid(
                "refresh.max_concurrent_projects must be at least 1".to_string(),
            ));
        }
        PropertyFilter::new(&self.include_properties).map(|_| ())
    }
}

/// Retention configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Newest versions kept per project
    pub versions_to_keep: usize,

    /// Retire versions unused for N days (0 = disabled)
    pub unused_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            versions_to_keep: 5,
            unused_days: 0,
        }
    }
}

impl RetentionConfig {
    pub fn validate(&self) -> DepotResult<()> {
        if self.versions_to_keep == 0 {
            return Err(invalid(
                "retention.versions_to_keep must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
