//! depot-refresh - metadata cache refresh engine
//!
//! Keeps a cache of projects, their versions, properties and dependency
//! graphs in step with an upstream artifact repository.

pub mod config;
pub mod digest;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod refresh;
pub mod repository;
pub mod store;
pub mod telemetry;

pub use error::{DepotError, DepotResult};
pub use refresh::{ArtifactsRefreshService, Collaborators};
