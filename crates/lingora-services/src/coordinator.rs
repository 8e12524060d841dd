//! Write-through coordination between the profile store and the cache.
//!
//! Every profile mutation flows through the coordinator, which owns the
//! ordering: commit to the store, write the fresh view through the cache,
//! fire the change event. The cache layer swallows its own failures, so a
//! write that commits always succeeds from the caller's point of view and a
//! later read falls back to the store.

use std::sync::Arc;

use lingora_cache::ProfileCache;
use lingora_core::models::{FileType, ProfileUpdate, ProfileView};
use lingora_core::AppError;
use lingora_db::ProfileStore;
use lingora_storage::{keys, ObjectStorage};

use crate::notify::ChangeNotifier;

pub struct ProfileCoordinator {
    store: Arc<dyn ProfileStore>,
    cache: Arc<dyn ProfileCache>,
    storage: Arc<dyn ObjectStorage>,
    notifier: Arc<ChangeNotifier>,
}

impl ProfileCoordinator {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        cache: Arc<dyn ProfileCache>,
        storage: Arc<dyn ObjectStorage>,
        notifier: Arc<ChangeNotifier>,
    ) -> Self {
        Self {
            store,
            cache,
            storage,
            notifier,
        }
    }

    /// Cache-first profile read. A miss reads the store, creating the profile
    /// on first access, and populates the cache without blocking the caller.
    #[tracing::instrument(skip(self), fields(owner_id = %owner_id))]
    pub async fn get_profile(&self, owner_id: &str) -> Result<ProfileView, AppError> {
        if let Some(view) = self.cache.get(owner_id).await {
            tracing::debug!("Profile served from cache");
            return Ok(view);
        }

        let record = self.store.fetch_or_create(owner_id).await?;
        let view = ProfileView::from(record);

        let cache = Arc::clone(&self.cache);
        let owner = owner_id.to_string();
        let cached_view = view.clone();
        tokio::spawn(async move {
            cache.put(&owner, &cached_view).await;
        });

        Ok(view)
    }

    /// Merge a partial update into the record, retrying once when the commit
    /// loses against a concurrent transaction, then write the fresh view
    /// through the cache and fire the change event.
    #[tracing::instrument(skip(self, update), fields(owner_id = %owner_id, actor = %actor))]
    pub async fn update_profile(
        &self,
        owner_id: &str,
        update: &ProfileUpdate,
        actor: &str,
    ) -> Result<ProfileView, AppError> {
        let record = match self.store.apply_update(owner_id, update, actor).await {
            Ok(record) => record,
            Err(AppError::ConflictOnCommit) => {
                tracing::info!("Update lost a commit race, retrying once");
                self.store.apply_update(owner_id, update, actor).await?
            }
            Err(e) => return Err(e),
        };

        let view = ProfileView::from(record);
        self.publish(owner_id, &view).await;
        Ok(view)
    }

    /// Point the record at a freshly uploaded avatar blob. Returns the new
    /// view together with the key the record referenced before this commit.
    #[tracing::instrument(skip(self, url), fields(owner_id = %owner_id, avatar.key = %key))]
    pub async fn commit_avatar(
        &self,
        owner_id: &str,
        key: &str,
        url: &str,
    ) -> Result<(ProfileView, Option<String>), AppError> {
        let (record, previous_key) = self.store.set_avatar(owner_id, key, url).await?;

        let view = ProfileView::from(record);
        self.publish(owner_id, &view).await;
        Ok((view, previous_key))
    }

    /// Clear a file reference from the record, then delete the blob.
    ///
    /// Idempotent end to end: a key the record does not reference skips the
    /// record write, and the storage delete succeeds on a missing blob.
    /// Record first, blob second, so a crash in between leaves an orphaned
    /// blob, never a dangling reference.
    ///
    /// The blob delete only runs for keys this owner may touch: either the
    /// record referenced the key, or the key sits under the owner's own
    /// storage prefix (the retry case, where a previous call already cleared
    /// the reference). Keys are visible in public URLs, so any other key is
    /// acknowledged without touching storage.
    #[tracing::instrument(skip(self), fields(owner_id = %owner_id, file_type = ?file_type, key = %key))]
    pub async fn delete_file_reference(
        &self,
        owner_id: &str,
        file_type: FileType,
        key: &str,
    ) -> Result<(), AppError> {
        let updated = match file_type {
            FileType::Avatar => self.store.clear_avatar(owner_id, key).await?,
            FileType::Document => self.store.clear_document_reference(owner_id, key).await?,
        };

        match updated {
            Some(record) => {
                let view = ProfileView::from(record);
                self.cache.invalidate(owner_id).await;
                self.cache.put(owner_id, &view).await;
            }
            None => {
                let owned_prefix = match file_type {
                    FileType::Avatar => keys::avatar_prefix(owner_id),
                    FileType::Document => keys::document_prefix(owner_id),
                };
                if !key.starts_with(&owned_prefix) {
                    tracing::warn!("Key is outside the caller's prefix, blob left untouched");
                    return Ok(());
                }
                tracing::debug!("No record reference matched the deleted key");
            }
        }

        self.storage.delete(key).await?;
        Ok(())
    }

    /// Sweep the owner's cache entries, including derived keys from earlier
    /// queries, write the fresh view through, then fire the change event.
    async fn publish(&self, owner_id: &str, view: &ProfileView) {
        self.cache.invalidate(owner_id).await;
        self.cache.put(owner_id, view).await;
        self.notifier.notify_profile_changed(view);
    }
}
