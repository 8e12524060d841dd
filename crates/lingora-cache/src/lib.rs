//! Read-through cache for profile views.
//!
//! The cache is strictly an accelerator: every operation is best-effort and
//! swallows backend failures after logging them, so a Redis outage degrades
//! reads to the database instead of failing requests. Entries live under
//! `profile:{owner_id}` with a TTL backstop; invalidation also sweeps any
//! derived keys under `profile:{owner_id}:*`.

pub mod disabled;
pub mod keys;
pub mod redis_cache;
pub mod traits;

pub use disabled::DisabledCache;
pub use keys::{cache_key, cache_key_pattern};
pub use redis_cache::RedisProfileCache;
pub use traits::ProfileCache;
