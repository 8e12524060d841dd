use std::time::Duration;

use async_trait::async_trait;
use lingora_core::models::ProfileView;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::Client;

use crate::keys::{cache_key, cache_key_pattern};
use crate::traits::ProfileCache;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const SCAN_BATCH: usize = 100;

/// Redis-backed profile cache.
///
/// Uses a managed connection that reconnects on failure. One retry per
/// command keeps a flapping Redis from stalling request handling.
#[derive(Clone)]
pub struct RedisProfileCache {
    manager: ConnectionManager,
    ttl_secs: u64,
}

impl RedisProfileCache {
    pub async fn connect(redis_url: &str, ttl_secs: u64) -> Result<Self, redis::RedisError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(CONNECT_TIMEOUT);

        let client = Client::open(redis_url)?;
        let manager = client.get_connection_manager_with_config(config).await?;

        Ok(RedisProfileCache { manager, ttl_secs })
    }
}

#[async_trait]
impl ProfileCache for RedisProfileCache {
    async fn get(&self, owner_id: &str) -> Option<ProfileView> {
        let key = cache_key(owner_id);
        let mut conn = self.manager.clone();

        match redis::cmd("GET")
            .arg(&key)
            .query_async::<Option<String>>(&mut conn)
            .await
        {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(view) => {
                    tracing::debug!(key = %key, "Profile cache hit");
                    Some(view)
                }
                Err(e) => {
                    // An entry written by an older schema no longer decodes;
                    // drop it so the next write repopulates the key.
                    tracing::warn!(error = %e, key = %key, "Dropping undecodable cache entry");
                    let _ = redis::cmd("DEL")
                        .arg(&key)
                        .query_async::<()>(&mut conn)
                        .await;
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Profile cache read failed");
                None
            }
        }
    }

    async fn put(&self, owner_id: &str, view: &ProfileView) {
        let key = cache_key(owner_id);
        let payload = match serde_json::to_string(view) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Failed to serialize profile for cache");
                return;
            }
        };

        let mut conn = self.manager.clone();
        if let Err(e) = redis::cmd("SET")
            .arg(&key)
            .arg(payload)
            .arg("EX")
            .arg(self.ttl_secs)
            .query_async::<()>(&mut conn)
            .await
        {
            tracing::warn!(error = %e, key = %key, "Profile cache write failed");
        }
    }

    async fn invalidate(&self, owner_id: &str) {
        let key = cache_key(owner_id);
        let mut conn = self.manager.clone();

        if let Err(e) = redis::cmd("DEL")
            .arg(&key)
            .query_async::<()>(&mut conn)
            .await
        {
            tracing::warn!(error = %e, key = %key, "Profile cache invalidation failed");
            return;
        }

        // Derived entries live under "profile:{owner}:...". SCAN walks them
        // incrementally so a large keyspace never blocks the server the way
        // KEYS would.
        let pattern = cache_key_pattern(owner_id);
        let mut cursor: u64 = 0;
        loop {
            let reply = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async::<(u64, Vec<String>)>(&mut conn)
                .await;

            let (next_cursor, keys) = match reply {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::warn!(error = %e, pattern = %pattern, "Cache key scan failed");
                    return;
                }
            };

            if !keys.is_empty() {
                if let Err(e) = redis::cmd("DEL")
                    .arg(&keys)
                    .query_async::<()>(&mut conn)
                    .await
                {
                    tracing::warn!(error = %e, pattern = %pattern, "Derived cache delete failed");
                    return;
                }
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        tracing::debug!(key = %key, "Profile cache entries invalidated");
    }
}
