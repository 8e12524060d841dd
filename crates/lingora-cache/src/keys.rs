/// Cache key for an owner's profile view.
pub fn cache_key(owner_id: &str) -> String {
    format!("profile:{}", owner_id)
}

/// Match pattern for derived entries keyed under the owner's profile.
pub fn cache_key_pattern(owner_id: &str) -> String {
    format!("profile:{}:*", owner_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_shape() {
        assert_eq!(cache_key("user-123"), "profile:user-123");
        assert_eq!(cache_key_pattern("user-123"), "profile:user-123:*");
    }

    #[test]
    fn test_pattern_excludes_primary_key() {
        // The primary entry must not match its own derived-key pattern, so a
        // pattern sweep never double-deletes it.
        let key = cache_key("user-123");
        let pattern = cache_key_pattern("user-123");
        let prefix = pattern.trim_end_matches('*');
        assert!(!key.starts_with(prefix));
    }
}
