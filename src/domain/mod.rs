//! Domain model for the metadata cache
//!
//! Projects, their known versions, per-version properties and dependency
//! edges, plus the bookkeeping types the refresh engine reports through.

pub mod coordinate;
pub mod mismatch;
pub mod project;
pub mod response;
pub mod status;
pub mod version;

pub use coordinate::{ProjectCoordinate, VersionKey, ALL, MASTER_SNAPSHOT, MISSING};
pub use mismatch::VersionMismatch;
pub use project::{ProjectData, ProjectProperty, ProjectVersionDependency};
pub use response::{ErrorKind, EventError, MetadataEventResponse};
pub use status::RefreshStatus;
pub use version::{compare_versions, is_snapshot, parse_version, sort_versions};
