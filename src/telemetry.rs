//! Logging setup
//!
//! Installs a `tracing` subscriber for embedding applications. Refresh
//! spans carry `group_id`, `artifact_id` and `version_id` fields, so the
//! JSON format is the one to pick when logs are shipped somewhere.

use crate::config::GeneralConfig;
use crate::error::{DepotError, DepotResult};
use tracing_subscriber::EnvFilter;

/// Filter directive for a verbosity level: 0 = warn, 1 = info, 2+ = debug
pub fn filter_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "depot_refresh=warn",
        1 => "depot_refresh=info",
        _ => "depot_refresh=debug",
    }
}

/// Install the global subscriber
///
/// `general.verbose` raises the level to at least info. `RUST_LOG`, when
/// set, overrides the computed filter.
pub fn init(general: &GeneralConfig, verbosity: u8) -> DepotResult<()> {
    let verbosity = if general.verbose {
        verbosity.max(1)
    } else {
        verbosity
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbosity)));

    let result = match general.log_format.as_str() {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .try_init(),
        "text" => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init(),
        other => {
            return Err(DepotError::Internal(format!(
                "unknown log format '{}', expected text or json",
                other
            )))
        }
    };

    result.map_err(|e| DepotError::Internal(format!("installing log subscriber: {}", e)))
}
