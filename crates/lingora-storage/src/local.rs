use crate::traits::{ObjectStorage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for blob storage (e.g., "/var/lib/lingora/media")
    /// * `base_url` - Base URL for serving blobs (e.g., "http://localhost:3000/media")
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

    /// Convert storage key to filesystem path with security validation
    ///
    /// This function validates that the storage key doesn't contain path traversal
    /// sequences that could escape the base storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        if storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        // create_new mirrors the conditional-put contract: an existing key is
        // a conflict, never an overwrite.
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    StorageError::KeyConflict(key.to_string())
                } else {
                    StorageError::UploadFailed(format!(
                        "Failed to create file {}: {}",
                        path.display(),
                        e
                    ))
                }
            })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(data)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        // NotFound is success: the key may already be gone, or a racing
        // cleanup may remove it between any pre-check and the unlink.
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![self.base_path.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::BackendError(e.to_string())),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StorageError::BackendError(e.to_string()))?
            {
                let entry_path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| StorageError::BackendError(e.to_string()))?;

                if file_type.is_dir() {
                    pending.push(entry_path);
                } else if let Ok(relative) = entry_path.strip_prefix(&self.base_path) {
                    // Keys always use '/' separators regardless of platform
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join("/");
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn ensure_bucket(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn test_storage(dir: &tempfile::TempDir) -> LocalStorage {
        LocalStorage::new(dir.path(), "http://localhost:3000/media".to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_local_storage_upload_download() {
        let dir = tempdir().unwrap();
        let storage = test_storage(&dir).await;

        let key = "avatars/abc123def456/1700000000000000_a1b2c3d4.webp";
        let data = b"fake image bytes".to_vec();

        storage.upload(key, data.clone(), "image/webp").await.unwrap();

        let downloaded = storage.download(key).await.unwrap();
        assert_eq!(data, downloaded);
    }

    #[tokio::test]
    async fn test_local_storage_rejects_duplicate_key() {
        let dir = tempdir().unwrap();
        let storage = test_storage(&dir).await;

        let key = "avatars/abc123def456/1700000000000000_a1b2c3d4.webp";
        storage
            .upload(key, b"first".to_vec(), "image/webp")
            .await
            .unwrap();

        let result = storage.upload(key, b"second".to_vec(), "image/webp").await;
        assert!(matches!(result, Err(StorageError::KeyConflict(_))));

        // The original blob is untouched
        let downloaded = storage.download(key).await.unwrap();
        assert_eq!(b"first".to_vec(), downloaded);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = test_storage(&dir).await;

        let result = storage.download("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_local_storage_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = test_storage(&dir).await;

        assert!(storage.delete("nonexistent/file.webp").await.is_ok());

        let key = "avatars/abc/1_x.webp";
        storage
            .upload(key, b"bytes".to_vec(), "image/webp")
            .await
            .unwrap();
        assert!(storage.delete(key).await.is_ok());
        assert!(storage.delete(key).await.is_ok());
        assert!(!storage.exists(key).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_deletes_both_succeed() {
        let dir = tempdir().unwrap();
        let storage = std::sync::Arc::new(test_storage(&dir).await);

        let key = "avatars/abc/1_x.webp";
        storage
            .upload(key, b"bytes".to_vec(), "image/webp")
            .await
            .unwrap();

        let a = {
            let storage = storage.clone();
            tokio::spawn(async move { storage.delete(key).await })
        };
        let b = {
            let storage = storage.clone();
            tokio::spawn(async move { storage.delete(key).await })
        };

        assert!(a.await.unwrap().is_ok());
        assert!(b.await.unwrap().is_ok());
        assert!(!storage.exists(key).await.unwrap());
    }

    #[tokio::test]
    async fn test_local_storage_exists() {
        let dir = tempdir().unwrap();
        let storage = test_storage(&dir).await;

        let key = "avatars/abc/1_x.webp";
        storage
            .upload(key, b"bytes".to_vec(), "image/webp")
            .await
            .unwrap();

        assert!(storage.exists(key).await.unwrap());
        assert!(!storage.exists("avatars/abc/2_y.webp").await.unwrap());
    }

    #[tokio::test]
    async fn test_local_storage_list_filters_by_prefix() {
        let dir = tempdir().unwrap();
        let storage = test_storage(&dir).await;

        storage
            .upload("avatars/owner1/1_a.webp", b"a".to_vec(), "image/webp")
            .await
            .unwrap();
        storage
            .upload("avatars/owner1/2_b.webp", b"b".to_vec(), "image/webp")
            .await
            .unwrap();
        storage
            .upload("avatars/owner2/3_c.webp", b"c".to_vec(), "image/webp")
            .await
            .unwrap();

        let keys = storage.list("avatars/owner1/").await.unwrap();
        assert_eq!(
            keys,
            vec![
                "avatars/owner1/1_a.webp".to_string(),
                "avatars/owner1/2_b.webp".to_string()
            ]
        );

        let all = storage.list("avatars/").await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_public_url_shape() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:3000/media/".to_string())
            .await
            .unwrap();

        assert_eq!(
            storage.public_url("avatars/abc/1_x.webp"),
            "http://localhost:3000/media/avatars/abc/1_x.webp"
        );
    }

    #[tokio::test]
    async fn test_ensure_bucket_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = test_storage(&dir).await;

        assert!(storage.ensure_bucket().await.is_ok());
        assert!(storage.ensure_bucket().await.is_ok());
    }
}
