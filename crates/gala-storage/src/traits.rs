//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must
//! implement. No retry logic lives here; callers treat a failed operation as
//! a pipeline failure and let the job queue's retry policy decide.

use async_trait::async_trait;
use gala_core::StorageBackend;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait so
/// the intent issuer and the processing pipelines can work against any
/// backend without coupling to implementation details.
///
/// **Key format:** `events/{event_id}/{variant}/{media_id}.{ext}`; see the
/// crate root documentation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Generate a presigned PUT URL scoped to exactly one key and content
    /// type, valid for `expires_in`. Clients upload the original bytes
    /// directly to this URL. Only supported by S3 backends; others return a
    /// `ConfigError`.
    async fn signed_put_url(
        &self,
        storage_key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Download an object fully into memory.
    async fn get_bytes(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Upload an object to a specific storage key.
    async fn put_bytes(
        &self,
        storage_key: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<()>;

    /// Publicly reachable URL for an object, if the backend exposes one.
    fn public_url(&self, storage_key: &str) -> Option<String>;

    /// Check if an object exists.
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
