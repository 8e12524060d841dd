//! Storage abstraction trait
//!
//! This module defines the ObjectStorage trait that all storage backends must
//! implement, and the storage error taxonomy.

use async_trait::async_trait;
use lingora_core::{AppError, StorageBackend};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Key already exists: {0}")]
    KeyConflict(String),

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

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("object {}", key)),
            other => AppError::StorageUnavailable(other.to_string()),
        }
    }
}

/// Object storage abstraction
///
/// All storage backends (S3-compatible, local filesystem) must implement this
/// trait so the upload pipeline and coordinator can work against any backend
/// without coupling to implementation details.
///
/// Contract highlights:
/// - `upload` never overwrites: an existing key is a `KeyConflict`.
/// - `delete` is idempotent: deleting a missing key is a no-op success, so
///   racing cleanup calls cannot fail each other.
/// - `public_url` is a pure string computation with no I/O.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload data to a storage key. Refuses to overwrite an existing key.
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Download an object by its storage key
    async fn download(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Delete an object by its storage key. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if an object exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// List all keys under a prefix
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Public URL for a key. Pure; performs no I/O and no existence check.
    fn public_url(&self, key: &str) -> String;

    /// Create the backing bucket (or directory) if it does not exist yet.
    /// Tolerates a race where another process creates it first.
    async fn ensure_bucket(&self) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingora_core::ErrorMetadata;

    #[test]
    fn test_not_found_maps_to_app_not_found() {
        let err: AppError = StorageError::NotFound("avatars/abc/1_x.webp".to_string()).into();
        assert_eq!(err.http_status_code(), 404);
        assert!(err.client_message().contains("avatars/abc/1_x.webp"));
    }

    #[test]
    fn test_backend_errors_map_to_storage_unavailable() {
        let err: AppError = StorageError::UploadFailed("connection reset".to_string()).into();
        assert_eq!(err.error_code(), "STORAGE_UNAVAILABLE");
        assert!(err.is_recoverable());
    }
}
