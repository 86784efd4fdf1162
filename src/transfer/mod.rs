//! Copying one object from source to destination through a staging file.
//!
//! The staging file is removed on every exit path, including a failed upload
//! or a download that fails part-way through writing.

use crate::store::{ObjectStore, StoreError};
use crate::utils::compute_hash;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

/// The step of a transfer that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStage {
    Download,
    Upload,
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStage::Download => f.write_str("download"),
            TransferStage::Upload => f.write_str("upload"),
        }
    }
}

#[derive(Error, Debug)]
#[error("Transfer failed during {stage}: {source}")]
pub struct TransferError {
    pub stage: TransferStage,
    #[source]
    pub source: StoreError,
}

impl TransferError {
    fn download(source: impl Into<StoreError>) -> Self {
        Self {
            stage: TransferStage::Download,
            source: source.into(),
        }
    }

    fn upload(source: StoreError) -> Self {
        Self {
            stage: TransferStage::Upload,
            source,
        }
    }
}

/// What a successful transfer moved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOutcome {
    pub bytes: u64,
    pub sha256: String,
}

/// Download `source_id`, stage it at `staging_path`, upload it as `dest_id`.
pub async fn transfer(
    source: &dyn ObjectStore,
    source_id: &str,
    dest: &dyn ObjectStore,
    dest_id: &str,
    staging_path: &Path,
) -> Result<TransferOutcome, TransferError> {
    let content = source
        .download(source_id)
        .await
        .map_err(TransferError::download)?;

    let outcome = TransferOutcome {
        bytes: content.len() as u64,
        sha256: compute_hash(&content),
    };

    let result = stage_and_upload(&content, dest, dest_id, staging_path).await;
    remove_staging_file(staging_path).await;
    result?;

    debug!(
        "Copied {} -> {} ({} bytes, sha256 {})",
        source_id, dest_id, outcome.bytes, outcome.sha256
    );

    Ok(outcome)
}

async fn stage_and_upload(
    content: &[u8],
    dest: &dyn ObjectStore,
    dest_id: &str,
    staging_path: &Path,
) -> Result<(), TransferError> {
    if let Some(parent) = staging_path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(TransferError::download)?;
    }

    // Overwrites whatever an interrupted earlier run left behind
    fs::write(staging_path, content)
        .await
        .map_err(TransferError::download)?;

    dest.upload(staging_path, dest_id)
        .await
        .map_err(TransferError::upload)
}

async fn remove_staging_file(staging_path: &Path) {
    match fs::remove_file(staging_path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            "Failed to remove staging file {}: {}",
            staging_path.display(),
            e
        ),
    }
}
