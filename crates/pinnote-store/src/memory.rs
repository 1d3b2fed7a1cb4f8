//! In-memory object store backend.
//!
//! Used for local development and tests. Signed URLs are deterministic
//! capability tokens (sha256 over secret, path, and expiry) on a synthetic
//! host, so URL shape matches the hosted backend closely enough to exercise
//! cache and registry behavior. Request counters make round-trip bounds
//! assertable in tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use rand::Rng;
use sha2::{Digest, Sha256};

use pinnote_core::{Error, Result, SignedUrl};

use crate::backend::ObjectStore;

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    #[allow(dead_code)]
    content_type: String,
}

/// Map-backed [`ObjectStore`] with fault injection and request counting.
pub struct MemoryObjectStore {
    base_url: String,
    secret: String,
    objects: RwLock<HashMap<String, StoredObject>>,
    /// Paths whose next `put` fails (consumed on use).
    fail_puts: RwLock<HashSet<String>>,
    put_requests: AtomicUsize,
    /// Counts network-equivalent signing requests: each `create_signed_url`
    /// call and each `create_signed_urls` batch call increments by one.
    sign_requests: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        let secret: String = rand::thread_rng()
            .sample_iter(rand::distributions::Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        Self {
            base_url: "https://storage.local".to_string(),
            secret,
            objects: RwLock::new(HashMap::new()),
            fail_puts: RwLock::new(HashSet::new()),
            put_requests: AtomicUsize::new(0),
            sign_requests: AtomicUsize::new(0),
        }
    }

    /// Arrange for the next `put` to the given path to fail with an
    /// upload error. Test hook for partial-upload rollback behavior.
    pub fn fail_next_put(&self, path: &str) {
        self.fail_puts
            .write()
            .expect("lock poisoned")
            .insert(path.to_string());
    }

    pub fn put_request_count(&self) -> usize {
        self.put_requests.load(Ordering::SeqCst)
    }

    pub fn sign_request_count(&self) -> usize {
        self.sign_requests.load(Ordering::SeqCst)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.read().expect("lock poisoned").contains_key(path)
    }

    pub fn object_count(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    fn sign(&self, path: &str, expires_at: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(path.as_bytes());
        hasher.update(expires_at.to_be_bytes());
        let token = hex::encode(hasher.finalize());
        format!(
            "{}/{}?token={}&expires={}",
            self.base_url, path, token, expires_at
        )
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.put_requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.write().expect("lock poisoned").remove(path) {
            return Err(Error::Upload(format!("injected failure for {}", path)));
        }
        self.objects.write().expect("lock poisoned").insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn create_signed_url(&self, path: &str, ttl_secs: u64) -> Result<String> {
        self.sign_requests.fetch_add(1, Ordering::SeqCst);
        if !self.contains(path) {
            return Err(Error::NotFound(format!("no object at {}", path)));
        }
        let expires_at = chrono::Utc::now().timestamp() + ttl_secs as i64;
        Ok(self.sign(path, expires_at))
    }

    async fn create_signed_urls(&self, paths: &[String], ttl_secs: u64) -> Result<Vec<SignedUrl>> {
        self.sign_requests.fetch_add(1, Ordering::SeqCst);
        let expires_at = chrono::Utc::now().timestamp() + ttl_secs as i64;
        let objects = self.objects.read().expect("lock poisoned");
        Ok(paths
            .iter()
            .filter(|p| objects.contains_key(p.as_str()))
            .map(|p| SignedUrl {
                path: p.clone(),
                url: self.sign(p, expires_at),
            })
            .collect())
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        let mut objects = self.objects.write().expect("lock poisoned");
        for path in paths {
            objects.remove(path);
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let objects = self.objects.read().expect("lock poisoned");
        let mut paths: Vec<String> = objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_list() {
        let store = MemoryObjectStore::new();
        store
            .put("u/img/original.webp", vec![1, 2], "image/webp")
            .await
            .unwrap();
        store
            .put("u/img/thumb.webp", vec![3], "image/webp")
            .await
            .unwrap();
        let listed = store.list("u/img/").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(store.put_request_count(), 2);
    }

    #[tokio::test]
    async fn test_signed_url_requires_object() {
        let store = MemoryObjectStore::new();
        let err = store.create_signed_url("missing", 3600).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_signed_url_carries_token_and_expiry() {
        let store = MemoryObjectStore::new();
        store.put("p", vec![0], "image/webp").await.unwrap();
        let url = store.create_signed_url("p", 3600).await.unwrap();
        assert!(url.contains("token="));
        assert!(url.contains("expires="));
        assert!(url.starts_with("https://storage.local/p?"));
    }

    #[tokio::test]
    async fn test_batch_sign_skips_missing() {
        let store = MemoryObjectStore::new();
        store.put("a", vec![0], "image/webp").await.unwrap();
        let urls = store
            .create_signed_urls(&["a".to_string(), "b".to_string()], 60)
            .await
            .unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].path, "a");
        assert_eq!(store.sign_request_count(), 1);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = MemoryObjectStore::new();
        store.put("a", vec![0], "image/webp").await.unwrap();
        store
            .remove(&["a".to_string(), "never-there".to_string()])
            .await
            .unwrap();
        assert!(!store.contains("a"));
    }

    #[tokio::test]
    async fn test_fail_injection_consumed() {
        let store = MemoryObjectStore::new();
        store.fail_next_put("a");
        assert!(store.put("a", vec![0], "image/webp").await.is_err());
        // Second attempt succeeds.
        assert!(store.put("a", vec![0], "image/webp").await.is_ok());
    }
}
