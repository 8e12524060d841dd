use async_trait::async_trait;
use lingora_core::models::ProfileView;

use crate::traits::ProfileCache;

/// No-op cache used when Redis is not configured or unreachable at startup.
/// Every read is a miss, so all traffic goes straight to the database.
#[derive(Clone, Default)]
pub struct DisabledCache;

#[async_trait]
impl ProfileCache for DisabledCache {
    async fn get(&self, _owner_id: &str) -> Option<ProfileView> {
        None
    }

    async fn put(&self, _owner_id: &str, _view: &ProfileView) {}

    async fn invalidate(&self, _owner_id: &str) {}
}
