use async_trait::async_trait;
use lingora_core::models::ProfileView;

/// Best-effort cache for rendered profile views.
///
/// Implementations never surface backend errors. A failed read behaves like a
/// miss, a failed write or invalidation is logged and dropped, and the TTL on
/// every entry bounds how long a missed invalidation can serve stale data.
#[async_trait]
pub trait ProfileCache: Send + Sync {
    /// Look up the cached view for an owner. Returns `None` on miss or on any
    /// backend failure.
    async fn get(&self, owner_id: &str) -> Option<ProfileView>;

    /// Store the view under the owner's key with the configured TTL.
    async fn put(&self, owner_id: &str, view: &ProfileView);

    /// Remove the owner's entry and any derived entries.
    async fn invalidate(&self, owner_id: &str);
}
