//! Integration tests for depot-refresh

use depot_refresh::config::{Config, RefreshConfig};
use depot_refresh::domain::{MetadataEventResponse, ProjectData, VersionKey};
use depot_refresh::handlers::{HandlerRegistry, InMemoryArtifactsHandler};
use depot_refresh::repository::{ArtifactType, InMemoryRepository};
use depot_refresh::store::{
    FileDigestIndex, InMemoryProjectStore, InMemoryQueryMetrics, InMemoryStatusStore,
    ProjectStore, RefreshStatusStore,
};
use depot_refresh::{ArtifactsRefreshService, Collaborators};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const GROUP: &str = "org.finos.legend";

struct Depot {
    service: ArtifactsRefreshService,
    projects: Arc<InMemoryProjectStore>,
    status: Arc<InMemoryStatusStore>,
    repository: Arc<InMemoryRepository>,
    entities: Arc<InMemoryArtifactsHandler>,
    generations: Arc<InMemoryArtifactsHandler>,
    dir: TempDir,
}

impl Depot {
    fn new(include_properties: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let projects = Arc::new(InMemoryProjectStore::new());
        let status = Arc::new(InMemoryStatusStore::new());
        let repository = Arc::new(InMemoryRepository::new());
        let entities = Arc::new(InMemoryArtifactsHandler::new(ArtifactType::Entities));
        let generations = Arc::new(InMemoryArtifactsHandler::new(ArtifactType::FileGenerations));

        let config = Config {
            refresh: RefreshConfig {
                artifact_types: vec![ArtifactType::Entities, ArtifactType::FileGenerations],
                include_properties: include_properties.iter().map(|p| p.to_string()).collect(),
                max_concurrent_projects: 2,
            },
            ..Config::default()
        };
        let service = ArtifactsRefreshService::from_config(
            Collaborators {
                projects: projects.clone(),
                status: status.clone(),
                repository: repository.clone(),
                digests: Arc::new(FileDigestIndex::new(dir.path().join("digests.json"))),
                metrics: Arc::new(InMemoryQueryMetrics::new()),
                handlers: HandlerRegistry::new()
                    .with(entities.clone())
                    .with(generations.clone()),
            },
            &config,
        )
        .unwrap();

        Self {
            service,
            projects,
            status,
            repository,
            entities,
            generations,
            dir,
        }
    }

    async fn project(&self, artifact_id: &str, versions: &[&str]) {
        let mut project = ProjectData::new(format!("PROD-{}", artifact_id), GROUP, artifact_id);
        for version in versions {
            project.add_version(version);
        }
        self.projects.upsert(&project).await.unwrap();
    }

    /// Publish a version upstream with one file per artifact type
    async fn publish(&self, artifact_id: &str, version_id: &str) {
        self.repository
            .add_versions(GROUP, artifact_id, &[version_id])
            .await;
        let key = VersionKey::new(GROUP, artifact_id, version_id);
        for artifact_type in [ArtifactType::Entities, ArtifactType::FileGenerations] {
            let file = self.file(&key, artifact_type);
            std::fs::write(&file, format!("{} {}", key, artifact_type)).unwrap();
            self.repository
                .set_files(&key, artifact_type, vec![file])
                .await;
        }
    }

    fn file(&self, key: &VersionKey, artifact_type: ArtifactType) -> PathBuf {
        self.dir.path().join(format!("{}-{}.json", key, artifact_type))
    }

    async fn stored(&self, artifact_id: &str) -> ProjectData {
        self.projects.find(GROUP, artifact_id).await.unwrap().unwrap()
    }

    async fn ingestion_count(&self) -> usize {
        self.entities.ingestions().await.len() + self.generations.ingestions().await.len()
    }
}

fn key(artifact_id: &str, version_id: &str) -> VersionKey {
    VersionKey::new(GROUP, artifact_id, version_id)
}

mod response_tests {
    use super::*;
    use depot_refresh::domain::ErrorKind;

    fn response(messages: &[&str], errors: &[&str]) -> MetadataEventResponse {
        let mut r = MetadataEventResponse::new();
        for m in messages {
            r.add_message(*m);
        }
        for e in errors {
            r.add_error(ErrorKind::Unexpected, *e);
        }
        r
    }

    #[test]
    fn combine_concatenates_in_order() {
        let a = response(&["m1", "m2"], &["e1"]);
        let b = response(&["m3"], &["e2", "e3"]);

        let combined = a.clone().combine(b.clone());

        assert_eq!(combined.messages, vec!["m1", "m2", "m3"]);
        assert_eq!(combined.error_messages(), vec!["e1", "e2", "e3"]);
        assert!(combined.has_errors());
        assert!(!response(&["only"], &[]).has_errors());
    }

    #[test]
    fn combine_with_empty_is_identity() {
        let a = response(&["m"], &["e"]);
        assert_eq!(a.clone().combine(MetadataEventResponse::new()), a);
        assert_eq!(MetadataEventResponse::new().combine(a.clone()), a);
    }
}

mod refresh_tests {
    use super::*;

    #[tokio::test]
    async fn second_refresh_is_idempotent() {
        let depot = Depot::new(&[]);
        depot.project("app", &[]).await;
        depot.project("lib", &[]).await;
        depot.publish("app", "1.0.0").await;
        depot.publish("lib", "2.0.0").await;
        depot
            .repository
            .set_dependencies(&key("app", "1.0.0"), vec![key("lib", "2.0.0")])
            .await;

        let first = depot
            .service
            .refresh_version(GROUP, "app", "1.0.0", false)
            .await
            .unwrap();
        assert!(!first.has_errors(), "{:?}", first.errors);
        let ingested = depot.ingestion_count().await;
        let edges = depot.stored("app").await.dependencies("1.0.0").to_vec();

        let second = depot
            .service
            .refresh_version(GROUP, "app", "1.0.0", false)
            .await
            .unwrap();

        assert!(!second.has_errors());
        assert_eq!(ingested, 4);
        assert_eq!(depot.ingestion_count().await, ingested);
        assert_eq!(depot.stored("app").await.dependencies("1.0.0"), edges.as_slice());
    }

    #[tokio::test]
    async fn changed_content_is_reingested() {
        let depot = Depot::new(&[]);
        depot.project("app", &[]).await;
        depot.publish("app", "1.0.0").await;

        depot
            .service
            .refresh_version(GROUP, "app", "1.0.0", false)
            .await
            .unwrap();
        std::fs::write(
            depot.file(&key("app", "1.0.0"), ArtifactType::Entities),
            "edited",
        )
        .unwrap();
        depot
            .service
            .refresh_version(GROUP, "app", "1.0.0", false)
            .await
            .unwrap();

        assert_eq!(depot.entities.ingestions().await.len(), 2);
        assert_eq!(depot.generations.ingestions().await.len(), 1);
    }

    #[tokio::test]
    async fn running_key_is_skipped() {
        let depot = Depot::new(&[]);
        depot.project("app", &[]).await;
        depot.publish("app", "1.0.0").await;
        depot
            .status
            .try_start(&VersionKey::all_projects("all"))
            .await
            .unwrap();
        let calls_before = depot.repository.call_count();

        let response = depot
            .service
            .refresh_all_versions_for_all_projects(false)
            .await
            .unwrap();

        assert!(response.is_empty(), "{:?}", response);
        assert_eq!(depot.repository.call_count(), calls_before);
        assert_eq!(depot.ingestion_count().await, 0);
    }

    #[tokio::test]
    async fn running_project_is_skipped_inside_batch() {
        let depot = Depot::new(&[]);
        depot.project("app", &[]).await;
        depot.project("other", &[]).await;
        depot.publish("app", "1.0.0").await;
        depot.publish("other", "1.0.0").await;
        depot
            .status
            .try_start(&key("app", "all"))
            .await
            .unwrap();

        let response = depot
            .service
            .refresh_all_versions_for_all_projects(false)
            .await
            .unwrap();

        assert!(!response.has_errors());
        assert!(depot.stored("app").await.versions().is_empty());
        assert_eq!(depot.stored("other").await.versions(), ["1.0.0"]);
    }

    #[tokio::test]
    async fn dependency_edges_commit_all_or_nothing() {
        let depot = Depot::new(&[]);
        depot.project("p", &[]).await;
        depot.project("q", &[]).await;
        depot.publish("p", "1.0").await;
        depot.publish("q", "2.0").await;
        depot
            .repository
            .set_dependencies(&key("p", "1.0"), vec![key("q", "2.0")])
            .await;
        depot
            .service
            .refresh_version(GROUP, "p", "1.0", false)
            .await
            .unwrap();
        let before = depot.stored("p").await.dependencies("1.0").to_vec();
        assert_eq!(before.len(), 1);

        depot
            .repository
            .set_dependencies(&key("p", "1.0"), vec![key("q", "2.0"), key("r", "3.0")])
            .await;
        let response = depot
            .service
            .refresh_version(GROUP, "p", "1.0", true)
            .await
            .unwrap();

        assert!(response.has_errors());
        assert!(response
            .error_messages()
            .contains(&"Could not find dependent project: [org.finos.legend-r-3.0]"));
        assert_eq!(depot.stored("p").await.dependencies("1.0"), before.as_slice());
    }

    #[tokio::test]
    async fn batch_never_commits_edge_to_failed_dependency() {
        let depot = Depot::new(&[]);
        depot.project("a-lib", &[]).await;
        depot.project("z-app", &[]).await;
        depot.publish("a-lib", "2.0.0").await;
        depot.publish("z-app", "1.0.0").await;
        depot.entities.fail_on(key("a-lib", "2.0.0")).await;
        depot
            .repository
            .set_dependencies(&key("z-app", "1.0.0"), vec![key("a-lib", "2.0.0")])
            .await;

        let response = depot
            .service
            .refresh_all_versions_for_all_projects(false)
            .await
            .unwrap();

        assert!(response
            .error_messages()
            .iter()
            .any(|e| e.contains("org.finos.legend-a-lib-2.0.0")));
        assert!(depot.stored("a-lib").await.versions().is_empty());
        assert!(depot.stored("z-app").await.dependencies("1.0.0").is_empty());
    }

    #[tokio::test]
    async fn dependent_commits_edge_to_refreshed_dependency() {
        let depot = Depot::new(&[]);
        depot.project("a-lib", &[]).await;
        depot.project("z-app", &[]).await;
        depot.publish("a-lib", "2.0.0").await;
        depot.publish("z-app", "1.0.0").await;
        depot
            .repository
            .set_dependencies(&key("z-app", "1.0.0"), vec![key("a-lib", "2.0.0")])
            .await;

        let response = depot
            .service
            .refresh_version(GROUP, "z-app", "1.0.0", false)
            .await
            .unwrap();

        assert!(!response.has_errors(), "{:?}", response.errors);
        assert_eq!(depot.stored("a-lib").await.versions(), ["2.0.0"]);
        assert_eq!(depot.stored("z-app").await.dependencies("1.0.0").len(), 1);
    }

    #[tokio::test]
    async fn dependency_cycle_terminates() {
        let depot = Depot::new(&[]);
        depot.project("a", &[]).await;
        depot.project("b", &[]).await;
        depot.publish("a", "1.0.0").await;
        depot.publish("b", "1.0.0").await;
        depot
            .repository
            .set_dependencies(&key("a", "1.0.0"), vec![key("b", "1.0.0")])
            .await;
        depot
            .repository
            .set_dependencies(&key("b", "1.0.0"), vec![key("a", "1.0.0")])
            .await;

        let response = depot
            .service
            .refresh_version(GROUP, "a", "1.0.0", false)
            .await
            .unwrap();

        assert!(!response.has_errors(), "{:?}", response.errors);
        assert_eq!(depot.entities.ingestions().await.len(), 2);
        assert_eq!(depot.stored("a").await.dependencies("1.0.0").len(), 1);
        assert_eq!(depot.stored("b").await.dependencies("1.0.0").len(), 1);
        assert!(!depot.status.get(&key("a", "1.0.0")).await.unwrap().running);
    }

    #[tokio::test]
    async fn properties_follow_allow_list() {
        let depot = Depot::new(&["pure.*", "exact.name"]);
        depot.project("app", &[]).await;
        depot.publish("app", "1.0.0").await;
        depot
            .repository
            .set_properties(
                &key("app", "1.0.0"),
                &[("pure.a", "1"), ("other", "2"), ("exact.name", "3")],
            )
            .await;

        depot
            .service
            .refresh_version(GROUP, "app", "1.0.0", false)
            .await
            .unwrap();

        let stored = depot.stored("app").await;
        let mut names: Vec<&str> = stored
            .properties("1.0.0")
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        names.sort();
        assert_eq!(names, vec!["exact.name", "pure.a"]);
    }
}

mod reconcile_tests {
    use super::*;

    #[tokio::test]
    async fn mismatch_in_both_directions() {
        let depot = Depot::new(&[]);
        depot.project("app", &["1.0", "1.1"]).await;
        depot
            .repository
            .add_versions(GROUP, "app", &["1.1", "1.2"])
            .await;

        let mismatches = depot.service.find_version_mismatches().await.unwrap();

        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].versions_not_in_cache, vec!["1.2"]);
        assert_eq!(mismatches[0].versions_not_in_repo, vec!["1.0"]);
    }

    #[tokio::test]
    async fn missing_versions_are_fixed() {
        let depot = Depot::new(&[]);
        depot.project("app", &["1.0.0"]).await;
        depot.publish("app", "1.0.0").await;
        depot.publish("app", "1.1.0").await;

        let response = depot.service.fix_missing_versions().await.unwrap();

        assert!(!response.has_errors());
        assert_eq!(depot.stored("app").await.versions(), ["1.0.0", "1.1.0"]);
        assert!(depot.service.find_version_mismatches().await.unwrap().is_empty());
    }
}

mod retention_tests {
    use super::*;

    #[tokio::test]
    async fn purge_removes_oldest() {
        let depot = Depot::new(&[]);
        depot.project("app", &["1.0", "1.1", "1.2", "1.3"]).await;

        let response = depot.service.retire_old_versions(2).await.unwrap();

        assert!(response
            .messages
            .contains(&"PROD-app purged 2 version".to_string()));
        assert!(response.messages.contains(&"Total 1 projects".to_string()));
        assert_eq!(depot.stored("app").await.versions(), ["1.2", "1.3"]);
        assert_eq!(
            depot.entities.deletions().await,
            vec![key("app", "1.0"), key("app", "1.1")]
        );
        assert_eq!(depot.generations.deletions().await.len(), 2);
    }

    #[tokio::test]
    async fn refresh_then_delete() {
        let depot = Depot::new(&[]);
        depot.project("app", &[]).await;
        depot.publish("app", "1.0.0").await;
        depot
            .service
            .refresh_all_versions_for_project(GROUP, "app", false)
            .await
            .unwrap();
        assert_eq!(depot.stored("app").await.versions(), ["1.0.0"]);

        depot.service.delete(GROUP, "app", "1.0.0").await.unwrap();

        assert!(depot.stored("app").await.versions().is_empty());
        assert_eq!(depot.entities.deletions().await, vec![key("app", "1.0.0")]);
    }
}
