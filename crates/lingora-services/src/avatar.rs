//! Avatar upload pipeline.
//!
//! A fixed sequence: validate in memory, snapshot the previous key, optimize,
//! upload under a fresh key, commit the reference through the coordinator,
//! then hand superseded blobs to the cleanup queue. Nothing touches storage
//! before validation passes, and a failed commit deletes the just-uploaded
//! blob before the error is returned.

use std::sync::Arc;
use std::time::Instant;

use lingora_core::AppError;
use lingora_db::ProfileStore;
use lingora_processing::{AvatarOptimizer, AvatarValidator};
use lingora_storage::{keys, ObjectStorage};
use lingora_worker::{CleanupQueue, CleanupTask};

use crate::coordinator::ProfileCoordinator;

/// What an accepted upload reports back: the public URL now on the profile
/// and the byte size of the blob actually stored.
#[derive(Debug, Clone)]
pub struct AvatarUploadOutcome {
    pub avatar_url: String,
    pub file_size: u64,
}

pub struct AvatarUploadPipeline {
    store: Arc<dyn ProfileStore>,
    storage: Arc<dyn ObjectStorage>,
    coordinator: Arc<ProfileCoordinator>,
    validator: AvatarValidator,
    optimizer: AvatarOptimizer,
    cleanup_queue: CleanupQueue,
}

impl AvatarUploadPipeline {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        storage: Arc<dyn ObjectStorage>,
        coordinator: Arc<ProfileCoordinator>,
        validator: AvatarValidator,
        optimizer: AvatarOptimizer,
        cleanup_queue: CleanupQueue,
    ) -> Self {
        Self {
            store,
            storage,
            coordinator,
            validator,
            optimizer,
            cleanup_queue,
        }
    }

    #[tracing::instrument(
        skip(self, data),
        fields(
            owner_id = %owner_id,
            file_name = %file_name,
            content_type = %content_type,
            upload_bytes = data.len(),
        )
    )]
    pub async fn upload(
        &self,
        owner_id: &str,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<AvatarUploadOutcome, AppError> {
        let start = Instant::now();

        let dimensions = self.validator.validate(content_type, &data)?;
        tracing::debug!(
            width = dimensions.width,
            height = dimensions.height,
            "Avatar upload validated"
        );

        // Unlocked read; a concurrent uploader may observe the same key. The
        // cleanup handler compares against the committed record before any
        // delete, so a shared snapshot is safe.
        let snapshot_key = self.store.current_avatar_key(owner_id).await?;

        let optimized = self.optimizer.optimize(&data, content_type);
        let file_size = optimized.data.len() as u64;

        let key = keys::avatar_key(owner_id, &optimized.extension);
        self.storage
            .upload(&key, optimized.data, &optimized.content_type)
            .await?;
        let url = self.storage.public_url(&key);

        let (view, committed_previous) =
            match self.coordinator.commit_avatar(owner_id, &key, &url).await {
                Ok(committed) => committed,
                Err(commit_err) => {
                    if let Err(delete_err) = self.storage.delete(&key).await {
                        tracing::error!(
                            key = %key,
                            error = %delete_err,
                            "Compensating delete failed after commit error, blob orphaned"
                        );
                    }
                    return Err(commit_err);
                }
            };

        self.schedule_previous_cleanup(owner_id, committed_previous, snapshot_key, &key);

        tracing::info!(
            key = %key,
            file_size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Avatar upload committed"
        );

        Ok(AvatarUploadOutcome {
            avatar_url: view.avatar_url.unwrap_or(url),
            file_size,
        })
    }

    /// Schedules deletion of every key this commit displaced. The committed
    /// previous key and the pre-upload snapshot differ only when another
    /// upload committed in between; both are superseded now.
    fn schedule_previous_cleanup(
        &self,
        owner_id: &str,
        committed_previous: Option<String>,
        snapshot_key: Option<String>,
        new_key: &str,
    ) {
        let mut superseded = Vec::new();
        for key in [committed_previous, snapshot_key].into_iter().flatten() {
            if key != new_key && !superseded.contains(&key) {
                superseded.push(key);
            }
        }
        for previous_key in superseded {
            self.cleanup_queue.submit(CleanupTask {
                owner_id: owner_id.to_string(),
                previous_key,
            });
        }
    }
}
