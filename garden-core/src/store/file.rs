//! File-backed store: one JSON file per key inside a data directory.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::{LocalStore, StoreError};

const FILE_EXTENSION: &str = "json";

/// Storage for cached collections on the local filesystem.
///
/// Each key maps to `<data_dir>/<key>.json`. Writes go to a temporary sibling
/// file first and are renamed into place, so a crash mid-write leaves the
/// previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Creates a new store rooted at `data_dir`. The directory is created lazily.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the full path for a key.
    pub fn path(&self, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.data_dir.join(format!("{}.{}", key, FILE_EXTENSION)))
    }
}

/// Keys become file names, so only a conservative character set is allowed.
fn validate_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        && !key.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

#[async_trait]
impl LocalStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path(key)?;
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(path, e)),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.path(key)?;
        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|e| StoreError::Io(self.data_dir.clone(), e))?;

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value)
            .await
            .map_err(|e| StoreError::Io(tmp_path.clone(), e))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| StoreError::Io(path, e))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(path, e)),
        }
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut entries = match fs::read_dir(&self.data_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StoreError::Io(self.data_dir.clone(), e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Io(self.data_dir.clone(), e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(FILE_EXTENSION) {
                fs::remove_file(&path)
                    .await
                    .map_err(|e| StoreError::Io(path.clone(), e))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (FileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf());
        (store, temp_dir)
    }

    #[test]
    fn test_store_path() {
        let (store, _temp) = test_store();
        let path = store.path("plants").unwrap();
        assert!(path.ends_with("plants.json"));
    }

    #[test]
    fn test_invalid_keys_rejected() {
        let (store, _temp) = test_store();
        assert!(store.path("").is_err());
        assert!(store.path("../escape").is_err());
        assert!(store.path(".hidden").is_err());
        assert!(store.path("a/b").is_err());
    }

    #[tokio::test]
    async fn test_get_nonexistent_returns_none() {
        let (store, _temp) = test_store();
        assert!(store.get("plants").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested_dir = temp_dir.path().join("nested").join("cache");
        let store = FileStore::new(nested_dir.clone());

        store.set("plants", "[]".to_string()).await.unwrap();

        assert!(nested_dir.join("plants.json").exists());
        assert!(!nested_dir.join("plants.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_overwrite_existing_value() {
        let (store, _temp) = test_store();

        store.set("plants", r#"[{"id":"1"}]"#.to_string()).await.unwrap();
        store.set("plants", r#"[{"id":"2"}]"#.to_string()).await.unwrap();

        let value = store.get("plants").await.unwrap().unwrap();
        assert_eq!(value, r#"[{"id":"2"}]"#);
    }

    #[tokio::test]
    async fn test_remove_missing_is_ok() {
        let (store, _temp) = test_store();
        store.remove("never_written").await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_removes_only_store_files() {
        let (store, temp) = test_store();
        store.set("plants", "[]".to_string()).await.unwrap();
        store.set("journal", "[]".to_string()).await.unwrap();
        std::fs::write(temp.path().join("notes.txt"), "keep me").unwrap();

        store.clear().await.unwrap();

        assert!(store.get("plants").await.unwrap().is_none());
        assert!(store.get("journal").await.unwrap().is_none());
        assert!(temp.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_clear_missing_directory_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("missing"));
        store.clear().await.unwrap();
    }
}
