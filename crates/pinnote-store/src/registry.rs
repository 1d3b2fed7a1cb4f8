//! In-memory bidirectional image registry for one editing session.
//!
//! Maps image UUIDs to their storage paths and currently-valid signed URLs,
//! plus a reverse URL → UUID index so the content transformer can rewrite
//! in both directions. Not persisted; rebuilt each time a note is opened.

use std::collections::HashMap;

use uuid::Uuid;

/// Normalize a URL to `scheme://host/path` for reverse lookup.
///
/// Two signed URLs for the same object differ only by token/expiry query
/// parameters, so matching discards everything from `?` (or `#`) on.
pub fn normalize_url(url: &str) -> &str {
    match url.find(['?', '#']) {
        Some(idx) => &url[..idx],
        None => url,
    }
}

/// Session-scoped lookup table between UUIDs, signed URLs, and storage
/// paths. Pure in-memory state; no persistence, no network access.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    url_by_id: HashMap<Uuid, String>,
    path_by_id: HashMap<Uuid, String>,
    id_by_url: HashMap<String, Uuid>,
    token_by_id: HashMap<Uuid, String>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) an image. A fresh signed URL for a known
    /// UUID replaces the previous reverse mapping.
    pub fn register(&mut self, id: Uuid, signed_url: &str, storage_path: &str) {
        if let Some(old_url) = self.url_by_id.insert(id, signed_url.to_string()) {
            self.id_by_url.remove(normalize_url(&old_url));
        }
        self.path_by_id.insert(id, storage_path.to_string());
        self.id_by_url
            .insert(normalize_url(signed_url).to_string(), id);
    }

    pub fn get_url(&self, id: Uuid) -> Option<&str> {
        self.url_by_id.get(&id).map(String::as_str)
    }

    pub fn get_storage_path(&self, id: Uuid) -> Option<&str> {
        self.path_by_id.get(&id).map(String::as_str)
    }

    /// Reverse lookup, tolerant of token/expiry churn in the query string.
    pub fn get_uuid(&self, url: &str) -> Option<Uuid> {
        self.id_by_url.get(normalize_url(url)).copied()
    }

    /// Remember the exact placeholder text an id appeared as in content.
    ///
    /// UUID hex is case-insensitive on parse, so the parsed id alone cannot
    /// reproduce the original spelling; keeping the verbatim token lets the
    /// reverse rewrite emit content byte-identical to what was loaded.
    pub fn remember_placeholder(&mut self, id: Uuid, token: &str) {
        self.token_by_id.insert(id, token.to_string());
    }

    /// The verbatim placeholder text remembered for an id, if any.
    pub fn get_placeholder(&self, id: Uuid) -> Option<&str> {
        self.token_by_id.get(&id).map(String::as_str)
    }

    pub fn has(&self, id: Uuid) -> bool {
        self.url_by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.url_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.url_by_id.is_empty()
    }

    /// Forget everything. Called when an editing session ends.
    pub fn clear(&mut self) {
        self.url_by_id.clear();
        self.path_by_id.clear();
        self.id_by_url.clear();
        self.token_by_id.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_strips_query() {
        assert_eq!(
            normalize_url("https://store/u/img/medium.webp?token=abc&expires=1"),
            "https://store/u/img/medium.webp"
        );
        assert_eq!(
            normalize_url("https://store/u/img/medium.webp"),
            "https://store/u/img/medium.webp"
        );
        assert_eq!(normalize_url("https://h/p#frag"), "https://h/p");
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ImageRegistry::new();
        let id = Uuid::new_v4();
        registry.register(id, "https://store/u/i/medium.webp?token=a", "u/i/medium.webp");

        assert!(registry.has(id));
        assert_eq!(
            registry.get_url(id),
            Some("https://store/u/i/medium.webp?token=a")
        );
        assert_eq!(registry.get_storage_path(id), Some("u/i/medium.webp"));
    }

    #[test]
    fn test_reverse_lookup_tolerates_token_churn() {
        let mut registry = ImageRegistry::new();
        let id = Uuid::new_v4();
        registry.register(id, "https://store/u/i/medium.webp?token=a", "u/i/medium.webp");

        // Same object, different token.
        assert_eq!(
            registry.get_uuid("https://store/u/i/medium.webp?token=zzz&expires=9"),
            Some(id)
        );
    }

    #[test]
    fn test_reregister_replaces_reverse_mapping() {
        let mut registry = ImageRegistry::new();
        let id = Uuid::new_v4();
        registry.register(id, "https://a/p1?token=1", "p1");
        registry.register(id, "https://a/p2?token=2", "p2");

        assert_eq!(registry.get_uuid("https://a/p2"), Some(id));
        assert_eq!(registry.get_uuid("https://a/p1"), None);
        assert_eq!(registry.get_storage_path(id), Some("p2"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_url_is_none() {
        let registry = ImageRegistry::new();
        assert_eq!(registry.get_uuid("https://other.host/pic.png"), None);
    }

    #[test]
    fn test_remembered_placeholder_keeps_spelling() {
        let mut registry = ImageRegistry::new();
        let id = Uuid::parse_str("ABCDEF01-1111-2222-3333-444455556666").unwrap();
        registry.remember_placeholder(id, "{{img:ABCDEF01-1111-2222-3333-444455556666}}");

        assert_eq!(
            registry.get_placeholder(id),
            Some("{{img:ABCDEF01-1111-2222-3333-444455556666}}")
        );
    }

    #[test]
    fn test_clear() {
        let mut registry = ImageRegistry::new();
        let id = Uuid::new_v4();
        registry.register(id, "https://a/p", "p");
        registry.remember_placeholder(id, "{{img:x}}");
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.get_placeholder(id), None);
    }
}
