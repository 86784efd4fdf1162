//! In-memory object store for tests and ephemeral use.
//!
//! [`MemoryStore`] keeps objects in a `BTreeMap` behind a `RwLock` and can be
//! told to fail listings, downloads or uploads so the pipeline's failure
//! handling can be exercised without a real backend.

use super::{ObjectStore, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::RwLock;
use tokio::fs;

#[derive(Debug, Default)]
struct MemoryState {
    objects: BTreeMap<String, Bytes>,
    fail_listing: bool,
    fail_downloads: HashSet<String>,
    fail_uploads: HashSet<String>,
    uploads: Vec<String>,
}

#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(MemoryState::default()),
        }
    }

    /// Build a store pre-populated with the given objects.
    pub fn with_objects<I, K, V>(name: impl Into<String>, objects: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Bytes>,
    {
        let store = Self::new(name);
        for (key, value) in objects {
            store.insert(key, value);
        }
        store
    }

    pub fn insert(&self, name: impl Into<String>, content: impl Into<Bytes>) {
        self.write_state()
            .objects
            .insert(name.into(), content.into());
    }

    pub fn get(&self, name: &str) -> Option<Bytes> {
        self.read_state().objects.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read_state().objects.contains_key(name)
    }

    /// All object names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.read_state().objects.keys().cloned().collect()
    }

    /// Names passed to successful `upload` calls, in call order.
    pub fn uploads(&self) -> Vec<String> {
        self.read_state().uploads.clone()
    }

    pub fn fail_listing(&self, fail: bool) {
        self.write_state().fail_listing = fail;
    }

    pub fn fail_download(&self, name: impl Into<String>) {
        self.write_state().fail_downloads.insert(name.into());
    }

    pub fn fail_upload(&self, name: impl Into<String>) {
        self.write_state().fail_uploads.insert(name.into());
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, MemoryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, MemoryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let state = self.read_state();
        if state.fail_listing {
            return Err(StoreError::Unavailable(format!(
                "{}: listing disabled",
                self.name
            )));
        }

        Ok(state
            .objects
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn download(&self, name: &str) -> Result<Bytes, StoreError> {
        let state = self.read_state();
        if state.fail_downloads.contains(name) {
            return Err(StoreError::Unavailable(format!(
                "{}: download of {} failed",
                self.name, name
            )));
        }

        state
            .objects
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn upload(&self, local_path: &Path, name: &str) -> Result<(), StoreError> {
        let should_fail = self.read_state().fail_uploads.contains(name);
        if should_fail {
            return Err(StoreError::Unavailable(format!(
                "{}: upload of {} failed",
                self.name, name
            )));
        }

        let content = fs::read(local_path).await?;

        let mut state = self.write_state();
        state.objects.insert(name.to_string(), Bytes::from(content));
        state.uploads.push(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_filters_by_prefix() {
        let store = MemoryStore::with_objects(
            "mem",
            [
                ("activity/2023-01-05_activity.csv", "a"),
                ("customer/2023-01-05_customer.csv", "b"),
            ],
        );

        let names = store.list("activity/").await.unwrap();
        assert_eq!(names, vec!["activity/2023-01-05_activity.csv".to_string()]);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::with_objects("mem", [("a/2023-01-x", "a")]);
        store.fail_download("a/2023-01-x");
        store.fail_listing(true);

        assert!(matches!(
            store.list("").await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            store.download("a/2023-01-x").await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staged");
        fs::write(&path, b"bytes").await.unwrap();

        let store = MemoryStore::default();
        store.upload(&path, "x/2023-01-y").await.unwrap();

        assert_eq!(store.get("x/2023-01-y").unwrap(), Bytes::from_static(b"bytes"));
        assert_eq!(store.uploads(), vec!["x/2023-01-y".to_string()]);
    }
}
