//! Signed-URL cache with a freshness buffer.
//!
//! An explicit, constructible cache owned by the store client (no
//! module-level global state). Entries are evicted lazily on lookup once
//! stale, and purged explicitly when their objects are deleted.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::trace;

/// One cached signed URL.
#[derive(Debug, Clone)]
struct CacheEntry {
    url: String,
    /// Unix timestamp after which the URL is no longer valid.
    expires_at: i64,
}

/// In-process cache of signed URLs keyed by storage path.
///
/// Freshness rule: a cached URL is reused only while
/// `now + buffer_secs < expires_at`, so callers never receive a URL that
/// expires within the buffer window. Safe for concurrent readers.
#[derive(Debug)]
pub struct SignedUrlCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    buffer_secs: u64,
}

impl SignedUrlCache {
    pub fn new(buffer_secs: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            buffer_secs,
        }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        Self::now() + (self.buffer_secs as i64) < entry.expires_at
    }

    /// Return the cached URL for `path` if it is still fresh.
    ///
    /// A stale entry is removed on the way out (lazy eviction).
    pub fn get_fresh(&self, path: &str) -> Option<String> {
        {
            let entries = self.entries.read().expect("cache lock poisoned");
            match entries.get(path) {
                Some(entry) if self.is_fresh(entry) => return Some(entry.url.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        trace!(storage_path = %path, "evicting stale signed URL");
        self.entries
            .write()
            .expect("cache lock poisoned")
            .remove(path);
        None
    }

    /// Cache a URL for `path`, valid until `expires_at` (unix seconds).
    pub fn insert(&self, path: &str, url: &str, expires_at: i64) {
        self.entries.write().expect("cache lock poisoned").insert(
            path.to_string(),
            CacheEntry {
                url: url.to_string(),
                expires_at,
            },
        );
    }

    /// Drop cache entries for deleted objects.
    pub fn purge(&self, paths: &[String]) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        for path in paths {
            entries.remove(path);
        }
    }

    /// Drop everything. Shutdown/test hook.
    pub fn clear(&self) {
        self.entries.write().expect("cache lock poisoned").clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
