//! Deletion of avatar blobs displaced by a newer upload.

use std::sync::Arc;

use async_trait::async_trait;
use lingora_db::ProfileStore;
use lingora_storage::ObjectStorage;
use lingora_worker::{CleanupHandler, CleanupTask};

/// Deletes a superseded avatar blob, re-checking the record first.
///
/// The task was enqueued when a replacement commit displaced `previous_key`.
/// By the time it runs the record may reference that key again only through
/// an interleaved commit, so the blob is deleted strictly when it differs
/// from the record's current key. The storage delete is idempotent, which
/// makes duplicate tasks for one key harmless.
pub struct AvatarCleanupHandler {
    store: Arc<dyn ProfileStore>,
    storage: Arc<dyn ObjectStorage>,
}

impl AvatarCleanupHandler {
    pub fn new(store: Arc<dyn ProfileStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { store, storage }
    }
}

#[async_trait]
impl CleanupHandler for AvatarCleanupHandler {
    async fn handle(&self, task: &CleanupTask) -> anyhow::Result<()> {
        let current = self.store.current_avatar_key(&task.owner_id).await?;
        if current.as_deref() == Some(task.previous_key.as_str()) {
            tracing::debug!(
                owner_id = %task.owner_id,
                key = %task.previous_key,
                "Blob is referenced by the record, keeping it"
            );
            return Ok(());
        }

        self.storage.delete(&task.previous_key).await?;
        tracing::debug!(
            owner_id = %task.owner_id,
            key = %task.previous_key,
            "Superseded avatar blob deleted"
        );
        Ok(())
    }
}
