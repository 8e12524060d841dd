//! Shared application state.

use std::sync::Arc;

use lingora_cache::ProfileCache;
use lingora_core::Config;
use lingora_db::ProfileStore;
use lingora_services::{AvatarUploadPipeline, ProfileCoordinator};
use lingora_storage::ObjectStorage;
use lingora_worker::CleanupQueue;

/// Everything a handler can reach, built once at startup in `setup`.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ProfileStore>,
    pub cache: Arc<dyn ProfileCache>,
    pub storage: Arc<dyn ObjectStorage>,
    pub coordinator: Arc<ProfileCoordinator>,
    pub pipeline: Arc<AvatarUploadPipeline>,
    pub cleanup_queue: CleanupQueue,
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
