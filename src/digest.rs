//! Content digests for change detection
//!
//! Candidate files are hashed with SHA-256 and compared with the digest
//! recorded at their last successful ingestion. Only changed files are
//! handed to a content handler unless a full update forces every file
//! through. Digests are a staleness index, never the content of record.

use crate::error::{DepotError, DepotResult};
use crate::store::DigestIndex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info};

/// Last-known digest of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDigestEntry {
    pub file_path: PathBuf,
    /// Lowercase hex SHA-256 of the file's bytes
    pub content_hash: String,
}

impl ArtifactDigestEntry {
    pub fn new(file_path: PathBuf, content_hash: String) -> Self {
        Self {
            file_path,
            content_hash,
        }
    }
}

/// A file selected for ingestion, with its digest when it could be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub digest: Option<String>,
}

/// SHA-256 of a file's contents as 64 lowercase hex characters
pub async fn sha256_file(path: &Path) -> DepotResult<String> {
    let contents = fs::read(path)
        .await
        .map_err(|e| DepotError::io(format!("reading artifact file {}", path.display()), e))?;

    let mut hasher = Sha256::new();
    hasher.update(&contents);
    Ok(hex::encode(hasher.finalize()))
}

/// Filter candidate files down to those whose content changed
///
/// With `include_unchanged` every candidate is selected. A file that cannot
/// be read is logged and treated as unchanged.
pub async fn select_files(
    index: &dyn DigestIndex,
    candidates: Vec<PathBuf>,
    include_unchanged: bool,
) -> DepotResult<Vec<SelectedFile>> {
    let mut selected = Vec::with_capacity(candidates.len());

    for path in candidates {
        let digest = match sha256_file(&path).await {
            Ok(digest) => digest,
            Err(e) => {
                error!("{}", e);
                if include_unchanged {
                    selected.push(SelectedFile { path, digest: None });
                }
                continue;
            }
        };

        let recorded = index.get(&path).await?;
        if include_unchanged || recorded.as_deref() != Some(digest.as_str()) {
            info!("loading artifacts from updated file: {}", path.display());
            debug!("file check sum: {}", digest);
            selected.push(SelectedFile {
                path,
                digest: Some(digest),
            });
        } else {
            debug!("unchanged file skipped: {}", path.display());
        }
    }

    Ok(selected)
}

/// Record the digests of files that were ingested
pub async fn record_digests(index: &dyn DigestIndex, files: &[SelectedFile]) -> DepotResult<()> {
    for file in files {
        if let Some(digest) = &file.digest {
            index.record(&file.path, digest).await?;
        }
    }
    Ok(())
}
