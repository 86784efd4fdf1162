//! Object store seam.
//!
//! Every store the pipeline talks to (source or destination) is reached through
//! [`ObjectStore`]. Vendor clients live outside this crate; the crate ships a
//! directory-backed [`LocalStore`] and an in-memory [`MemoryStore`].

mod local;
mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid object name: {0}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A handle to one object store.
///
/// Implementations are expected to enforce their own network timeouts; every
/// call returns success or a typed failure in finite time.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short name used in log lines ("source", "s3://bucket", ...).
    fn name(&self) -> &str;

    /// List every object name starting with `prefix`. Order is unspecified.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Fetch the full contents of an object.
    async fn download(&self, name: &str) -> Result<Bytes, StoreError>;

    /// Store the file at `local_path` under `name`, replacing any existing object.
    async fn upload(&self, local_path: &Path, name: &str) -> Result<(), StoreError>;
}
