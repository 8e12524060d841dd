//! Read-through cache initialization.
//!
//! The cache is an optional dependency: a missing `REDIS_URL` or an
//! unreachable Redis never blocks startup. The service falls back to the
//! disabled cache and serves every read from the database.

use std::sync::Arc;

use lingora_cache::{DisabledCache, ProfileCache, RedisProfileCache};
use lingora_core::Config;

pub async fn setup_cache(config: &Config) -> Arc<dyn ProfileCache> {
    let Some(redis_url) = config.redis_url.as_deref() else {
        tracing::info!("REDIS_URL not set, profile cache disabled");
        return Arc::new(DisabledCache);
    };

    match RedisProfileCache::connect(redis_url, config.cache_ttl_secs).await {
        Ok(cache) => {
            tracing::info!(ttl_secs = config.cache_ttl_secs, "Profile cache connected");
            Arc::new(cache)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis unreachable at startup, profile cache disabled");
            Arc::new(DisabledCache)
        }
    }
}
