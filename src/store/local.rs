use super::{ObjectStore, StoreError};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Suffix of in-flight uploads; hidden from listings
const UPLOAD_TMP_SUFFIX: &str = ".blobsync-tmp";

/// A directory treated as a bucket.
///
/// Object names are `/`-separated paths relative to the root directory.
#[derive(Debug, Clone)]
pub struct LocalStore {
    name: String,
    root: PathBuf,
}

impl LocalStore {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object name to a path under the root, refusing names that
    /// would escape it.
    fn object_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));

        if name.is_empty() || escapes {
            return Err(StoreError::InvalidName(name.to_string()));
        }

        Ok(self.root.join(relative))
    }

    /// Deepest directory every name starting with `prefix` must live in.
    /// Falls back to the root for prefixes without a usable directory part.
    fn prefix_dir(&self, prefix: &str) -> PathBuf {
        prefix
            .rsplit_once('/')
            .and_then(|(dir, _)| self.object_path(dir).ok())
            .unwrap_or_else(|| self.root.clone())
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        if !self.root.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }

        let mut names = Vec::new();

        let walk_root = self.prefix_dir(prefix);
        if !walk_root.is_dir() {
            // Nothing can live under a directory that does not exist
            return Ok(names);
        }

        for entry in WalkDir::new(&walk_root).min_depth(1) {
            // A partial listing would look like missing objects, so walk errors are fatal
            let entry = entry.map_err(|e| StoreError::Unavailable(e.to_string()))?;

            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };

            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            if name.ends_with(UPLOAD_TMP_SUFFIX) {
                continue;
            }

            if name.starts_with(prefix) {
                names.push(name);
            }
        }

        Ok(names)
    }

    async fn download(&self, name: &str) -> Result<Bytes, StoreError> {
        let path = self.object_path(name)?;

        match fs::read(&path).await {
            Ok(content) => Ok(Bytes::from(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn upload(&self, local_path: &Path, name: &str) -> Result<(), StoreError> {
        let path = self.object_path(name)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write atomically using temp file + rename
        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(UPLOAD_TMP_SUFFIX);
        let temp_path = PathBuf::from(temp_name);

        fs::copy(local_path, &temp_path).await?;
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write(root: &Path, name: &str, content: &str) {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_returns_nested_names_with_forward_slashes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "activity/2023-01-05_activity.csv", "a").await;
        write(dir.path(), "activity/nested/2023-02-01_activity.csv", "b").await;
        write(dir.path(), "customer/2023-01-05_customer.csv", "c").await;

        let store = LocalStore::new("local", dir.path());
        let mut names = store.list("activity/").await.unwrap();
        names.sort();

        assert_eq!(
            names,
            vec![
                "activity/2023-01-05_activity.csv".to_string(),
                "activity/nested/2023-02-01_activity.csv".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_only_walks_the_prefix_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "activity/2023-01-05_activity.csv", "a").await;
        write(dir.path(), "activity/2023-02-05_activity.csv", "b").await;
        write(dir.path(), "activity-old/2023-01-05_activity.csv", "c").await;
        write(dir.path(), "customer/2023-01-05_customer.csv", "d").await;

        let store = LocalStore::new("local", dir.path());
        assert_eq!(store.prefix_dir("activity/2023-01"), dir.path().join("activity"));
        assert_eq!(store.prefix_dir("activity"), dir.path().to_path_buf());
        assert_eq!(store.prefix_dir("../activity/"), dir.path().to_path_buf());

        assert_eq!(
            store.list("activity/2023-01").await.unwrap(),
            vec!["activity/2023-01-05_activity.csv".to_string()]
        );

        let mut names = store.list("activity").await.unwrap();
        names.sort();
        assert_eq!(names.len(), 3);
        assert_eq!(names[2], "activity/2023-02-05_activity.csv");
    }

    #[tokio::test]
    async fn test_list_prefix_without_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "activity/2023-01-05_activity.csv", "a").await;

        let store = LocalStore::new("local", dir.path());
        assert!(store.list("archive/activity/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_missing_root_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new("local", dir.path().join("missing"));

        let result = store.list("").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_download_missing_object_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new("local", dir.path());

        let result = store.download("activity/nope.csv").await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_upload_creates_parents_and_hides_temp_file() {
        let dir = TempDir::new().unwrap();
        let staged = dir.path().join("staged.csv");
        fs::write(&staged, "payload").await.unwrap();

        let bucket = dir.path().join("bucket");
        fs::create_dir_all(&bucket).await.unwrap();
        let store = LocalStore::new("local", &bucket);

        store
            .upload(&staged, "activity/2023-01-05_activity.csv")
            .await
            .unwrap();

        let content = store
            .download("activity/2023-01-05_activity.csv")
            .await
            .unwrap();
        assert_eq!(&content[..], b"payload");
        assert_eq!(
            store.list("").await.unwrap(),
            vec!["activity/2023-01-05_activity.csv".to_string()]
        );
    }

    #[tokio::test]
    async fn test_names_escaping_root_are_rejected() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new("local", dir.path());

        assert!(matches!(
            store.download("../etc/passwd").await,
            Err(StoreError::InvalidName(_))
        ));
        assert!(matches!(
            store.download("/etc/passwd").await,
            Err(StoreError::InvalidName(_))
        ));
    }
}
