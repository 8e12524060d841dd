//! Shared key generation for storage backends.
//!
//! Avatar keys: `avatars/{owner_hash}/{timestamp_micros}_{random}.{ext}`.
//! The owner hash scopes all of one user's blobs under a single prefix (so
//! cleanup can list them), the microsecond timestamp orders keys, and the
//! random suffix rules out collisions between uploads in the same microsecond.

use rand::distr::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

const OWNER_HASH_LEN: usize = 12;
const RANDOM_SUFFIX_LEN: usize = 8;

/// Short stable hex digest of an owner id. Keeps raw owner identifiers out
/// of public blob URLs.
pub fn owner_hash(owner_id: &str) -> String {
    let digest = Sha256::digest(owner_id.as_bytes());
    hex::encode(digest)[..OWNER_HASH_LEN].to_string()
}

/// Prefix under which all of one owner's avatar blobs live.
pub fn avatar_prefix(owner_id: &str) -> String {
    format!("avatars/{}/", owner_hash(owner_id))
}

/// Prefix under which all of one owner's credential documents live.
pub fn document_prefix(owner_id: &str) -> String {
    format!("documents/{}/", owner_hash(owner_id))
}

/// Generate a fresh avatar key for an owner. Unique across concurrent
/// uploads by the same or different owners.
pub fn avatar_key(owner_id: &str, ext: &str) -> String {
    let timestamp_micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(RANDOM_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!(
        "{}{}_{}.{}",
        avatar_prefix(owner_id),
        timestamp_micros,
        suffix,
        ext
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_hash_is_stable_and_short() {
        let a = owner_hash("user-123");
        let b = owner_hash("user-123");
        assert_eq!(a, b);
        assert_eq!(a.len(), OWNER_HASH_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_different_owners_get_different_prefixes() {
        assert_ne!(avatar_prefix("user-1"), avatar_prefix("user-2"));
        assert_ne!(document_prefix("user-1"), document_prefix("user-2"));
        assert_ne!(avatar_prefix("user-1"), document_prefix("user-1"));
    }

    #[test]
    fn test_avatar_key_shape() {
        let key = avatar_key("user-123", "webp");
        let prefix = avatar_prefix("user-123");
        assert!(key.starts_with(&prefix));
        assert!(key.ends_with(".webp"));

        let name = key.strip_prefix(&prefix).unwrap();
        let (stem, ext) = name.rsplit_once('.').unwrap();
        assert_eq!(ext, "webp");
        let (timestamp, suffix) = stem.split_once('_').unwrap();
        assert!(timestamp.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(suffix.len(), RANDOM_SUFFIX_LEN);
    }

    #[test]
    fn test_avatar_keys_do_not_collide() {
        let keys: std::collections::HashSet<String> =
            (0..100).map(|_| avatar_key("user-123", "webp")).collect();
        assert_eq!(keys.len(), 100);
    }
}
