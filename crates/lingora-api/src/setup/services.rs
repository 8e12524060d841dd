//! Service construction and wiring.

use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;

use lingora_cache::ProfileCache;
use lingora_core::Config;
use lingora_db::{PgProfileStore, ProfileStore};
use lingora_processing::{AvatarOptimizer, AvatarValidator};
use lingora_services::{
    AvatarCleanupHandler, AvatarUploadPipeline, ChangeNotifier, ProfileCoordinator,
};
use lingora_storage::ObjectStorage;
use lingora_worker::{CleanupQueue, CleanupQueueConfig};

use crate::state::AppState;

/// Wire the store, coordinator, upload pipeline, and cleanup queue into the
/// shared application state.
pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn ObjectStorage>,
    cache: Arc<dyn ProfileCache>,
) -> Result<Arc<AppState>> {
    let store: Arc<dyn ProfileStore> = Arc::new(PgProfileStore::new(pool));

    let notifier = Arc::new(ChangeNotifier::new(config.profile_webhook_url.clone())?);
    if notifier.is_enabled() {
        tracing::info!("Profile change webhook enabled");
    }

    let coordinator = Arc::new(ProfileCoordinator::new(
        Arc::clone(&store),
        Arc::clone(&cache),
        Arc::clone(&storage),
        notifier,
    ));

    let cleanup_handler = Arc::new(AvatarCleanupHandler::new(
        Arc::clone(&store),
        Arc::clone(&storage),
    ));
    let cleanup_queue = CleanupQueue::start(
        CleanupQueueConfig {
            max_workers: config.cleanup_workers,
            queue_capacity: config.cleanup_queue_capacity,
        },
        cleanup_handler,
    );
    tracing::info!(
        workers = config.cleanup_workers,
        queue_capacity = config.cleanup_queue_capacity,
        "Cleanup queue started"
    );

    let validator = AvatarValidator::new(
        config.min_avatar_size_bytes,
        config.max_avatar_size_bytes,
        config.max_avatar_dimension_px,
        config.avatar_allowed_content_types.clone(),
    );
    let optimizer = AvatarOptimizer::new(config.avatar_target_edge_px, config.avatar_webp_quality);

    let pipeline = Arc::new(AvatarUploadPipeline::new(
        Arc::clone(&store),
        Arc::clone(&storage),
        Arc::clone(&coordinator),
        validator,
        optimizer,
        cleanup_queue.clone(),
    ));

    Ok(Arc::new(AppState {
        config: config.clone(),
        store,
        cache,
        storage,
        coordinator,
        pipeline,
        cleanup_queue,
    }))
}
