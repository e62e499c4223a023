//! Version ordering
//!
//! Version strings are stored verbatim so identity with upstream is
//! preserved. Ordering pads short versions (`1.0` -> `1.0.0`) and compares
//! them by semver precedence; anything that still fails to parse sorts
//! after every parsable version, lexically.

use crate::domain::coordinate::MASTER_SNAPSHOT;
use crate::error::{DepotError, DepotResult};
use semver::Version;
use std::cmp::Ordering;

/// Whether the version is the snapshot pseudo-version
pub fn is_snapshot(version_id: &str) -> bool {
    version_id == MASTER_SNAPSHOT
}

/// Parse a version id, padding missing minor/patch components with zero
pub fn parse_version(version_id: &str) -> DepotResult<Version> {
    let split = version_id.find(['-', '+']).unwrap_or(version_id.len());
    let (core, suffix) = version_id.split_at(split);

    let components = core.split('.').count();
    if core.is_empty() || components > 3 {
        return Err(DepotError::InvalidVersion {
            version: version_id.to_string(),
            reason: "expected major[.minor[.patch]]".to_string(),
        });
    }

    let mut padded = core.to_string();
    for _ in components..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);

    Version::parse(&padded).map_err(|e| DepotError::InvalidVersion {
        version: version_id.to_string(),
        reason: e.to_string(),
    })
}

/// Total order over version strings
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_version(a), parse_version(b)) {
        (Ok(va), Ok(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Sort ascending (oldest first)
pub fn sort_versions(versions: &mut [String]) {
    versions.sort_by(|a, b| compare_versions(a, b));
}
