//! Configuration loading for depot-refresh
//!
//! Settings live in a single TOML file. A file that parses but holds
//! settings the engine cannot run with is rejected when loaded, naming the
//! file and the offending setting.

pub mod schema;

pub use schema::{Config, GeneralConfig, RefreshConfig, RetentionConfig, LOG_FORMATS};

use crate::error::{DepotError, DepotResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const APP_DIR: &str = "depot-refresh";

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join(APP_DIR)
}

/// Reads and writes the configuration file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for `config.toml` in the user's config directory
    pub fn new() -> Self {
        Self::at(Self::default_config_path())
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    pub fn default_config_path() -> PathBuf {
        app_dir(dirs::config_dir()).join("config.toml")
    }

    /// Directory for engine state kept between runs
    pub fn state_dir() -> PathBuf {
        app_dir(dirs::state_dir().or_else(dirs::data_local_dir))
    }

    /// Default location of the file-backed digest index
    pub fn digest_index_path() -> PathBuf {
        Self::state_dir().join("digests.json")
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load and validate the configuration; an absent file yields defaults
    pub async fn load(&self) -> DepotResult<Config> {
        match fs::read_to_string(&self.config_path).await {
            Ok(content) => Self::parse(&content, &self.config_path),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", self.config_path.display());
                Ok(Config::default())
            }
            Err(e) => Err(DepotError::io(
                format!("reading config from {}", self.config_path.display()),
                e,
            )),
        }
    }

    /// Parse configuration text read from `origin`
    pub fn parse(content: &str, origin: &Path) -> DepotResult<Config> {
        let config: Config = toml::from_str(content).map_err(|e| DepotError::ConfigInvalid {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate().map_err(|e| e.in_file(origin))?;
        Ok(config)
    }

    /// Write the configuration, refusing settings that would not load back
    pub async fn save(&self, config: &Config) -> DepotResult<()> {
        config.validate().map_err(|e| e.in_file(&self.config_path))?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DepotError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            DepotError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::ArtifactType;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::at(temp.path().join("nonexistent.toml"));

        let config = manager.load().await.unwrap();
        assert_eq!(config.general.log_format, "text");
        assert_eq!(config.refresh.artifact_types, ArtifactType::all().to_vec());
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::at(temp.path().join("nested").join("config.toml"));

        let mut config = Config::default();
        config.retention.versions_to_keep = 2;
        config.refresh.include_properties = vec!["pure.*".to_string()];

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.retention.versions_to_keep, 2);
        assert_eq!(loaded.refresh.include_properties, vec!["pure.*"]);
    }

    #[tokio::test]
    async fn malformed_file_is_invalid_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[refresh\nbroken").await.unwrap();

        let err = ConfigManager::at(&path).load().await.unwrap_err();
        assert!(matches!(err, DepotError::ConfigInvalid { .. }));
    }

    #[tokio::test]
    async fn unusable_settings_fail_to_load_with_their_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[refresh]\ninclude_properties = [\"pure.(\"]\n")
            .await
            .unwrap();

        match ConfigManager::at(&path).load().await {
            Err(DepotError::ConfigInvalid { path: origin, reason }) => {
                assert_eq!(origin, path);
                assert!(reason.contains("'pure.('"));
            }
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
    }

    #[test]
    fn empty_artifact_types_fail_to_parse() {
        let err = ConfigManager::parse("[refresh]\nartifact_types = []\n", Path::new("c.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("refresh.artifact_types"));
    }

    #[tokio::test]
    async fn save_refuses_unusable_settings() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let mut config = Config::default();
        config.refresh.max_concurrent_projects = 0;

        let err = ConfigManager::at(&path).save(&config).await.unwrap_err();

        assert!(matches!(err, DepotError::ConfigInvalid { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn digest_index_lives_in_state_dir() {
        let path = ConfigManager::digest_index_path();
        assert!(path.starts_with(ConfigManager::state_dir()));
        assert!(path.ends_with("depot-refresh/digests.json"));
    }
}
