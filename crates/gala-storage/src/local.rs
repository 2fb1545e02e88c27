use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use gala_core::StorageBackend;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Local filesystem storage implementation, used for development and tests.
///
/// Signed PUT URLs are not supported; upload intents require the S3 backend.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for object storage (e.g., "/var/lib/gala/media")
    /// * `base_url` - Base URL for serving objects (e.g., "http://localhost:4000/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert storage key to filesystem path, rejecting keys that could
    /// escape the base directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }
        Ok(self.base_path.join(storage_key))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn signed_put_url(
        &self,
        _storage_key: &str,
        _content_type: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        Err(StorageError::ConfigError(
            "Signed PUT URLs are only supported by the S3 backend".to_string(),
        ))
    }

    async fn get_bytes(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(storage_key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => Err(StorageError::DownloadFailed(e.to_string())),
        }
    }

    async fn put_bytes(
        &self,
        storage_key: &str,
        _content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        self.ensure_parent_dir(&path).await?;
        fs::write(&path, data)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        tracing::debug!(key = %storage_key, path = %path.display(), "Local write successful");
        Ok(())
    }

    fn public_url(&self, storage_key: &str) -> Option<String> {
        Some(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            storage_key
        ))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn storage() -> (TempDir, LocalStorage) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:4000/media".to_string())
            .await
            .unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let (_dir, storage) = storage().await;
        storage
            .put_bytes("events/a/originals/b.jpg", "image/jpeg", vec![1, 2, 3])
            .await
            .unwrap();
        let data = storage.get_bytes("events/a/originals/b.jpg").await.unwrap();
        assert_eq!(data, vec![1, 2, 3]);
        assert!(storage.exists("events/a/originals/b.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let (_dir, storage) = storage().await;
        let err = storage.get_bytes("events/a/originals/nope.jpg").await;
        assert!(matches!(err, Err(StorageError::NotFound(_))));
        assert!(!storage.exists("events/a/originals/nope.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn traversal_keys_rejected() {
        let (_dir, storage) = storage().await;
        let err = storage.get_bytes("../outside").await;
        assert!(matches!(err, Err(StorageError::InvalidKey(_))));
        let err = storage.get_bytes("/absolute").await;
        assert!(matches!(err, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn signed_put_is_unsupported() {
        let (_dir, storage) = storage().await;
        let err = storage
            .signed_put_url("events/a/originals/b.jpg", "image/jpeg", Duration::from_secs(300))
            .await;
        assert!(matches!(err, Err(StorageError::ConfigError(_))));
    }

    #[tokio::test]
    async fn public_url_joins_base() {
        let (_dir, storage) = storage().await;
        assert_eq!(
            storage.public_url("events/a/thumb/b.jpg").unwrap(),
            "http://localhost:4000/media/events/a/thumb/b.jpg"
        );
    }
}
