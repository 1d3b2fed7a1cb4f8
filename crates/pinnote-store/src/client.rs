//! Image store client: variant-group upload, cached signed-URL issuance,
//! and deletion over an [`ObjectStore`] backend.
//!
//! The three variant uploads of one image are treated as an atomic group:
//! if any variant fails, already-uploaded variants are deleted best-effort
//! before the error propagates, so no image is left half-persisted.
//! Transient network failures are retried with exponential backoff.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use pinnote_core::defaults::{
    ENV_SIGNED_URL_BUFFER, ENV_SIGNED_URL_TTL, SIGNED_URL_BUFFER_SECS, SIGNED_URL_TTL_SECS,
    STORE_MAX_RETRIES, STORE_RETRY_BASE_DELAY_MS,
};
use pinnote_core::{
    Error, ProcessedImage, ProgressFn, Result, StoragePaths, UploadedImage, VariantKind,
};

use crate::backend::ObjectStore;
use crate::cache::SignedUrlCache;

/// Configuration for [`ImageStoreClient`].
#[derive(Debug, Clone)]
pub struct StoreClientConfig {
    /// Validity window requested for signed URLs, in seconds.
    pub url_ttl_secs: u64,
    /// Freshness buffer: cached URLs expiring within this window are
    /// renewed early instead of served.
    pub url_buffer_secs: u64,
    /// Maximum attempts for transient store failures.
    pub max_retries: u32,
    /// Base delay for exponential backoff between attempts.
    pub retry_base_delay_ms: u64,
}

impl Default for StoreClientConfig {
    fn default() -> Self {
        Self {
            url_ttl_secs: SIGNED_URL_TTL_SECS,
            url_buffer_secs: SIGNED_URL_BUFFER_SECS,
            max_retries: STORE_MAX_RETRIES,
            retry_base_delay_ms: STORE_RETRY_BASE_DELAY_MS,
        }
    }
}

impl StoreClientConfig {
    /// Load from environment variables with fallback to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(val) = std::env::var(ENV_SIGNED_URL_TTL) {
            if let Ok(ttl) = val.parse::<u64>() {
                config.url_ttl_secs = ttl;
            } else {
                tracing::warn!(value = %val, "Invalid signed URL TTL, using default");
            }
        }
        if let Ok(val) = std::env::var(ENV_SIGNED_URL_BUFFER) {
            if let Ok(buffer) = val.parse::<u64>() {
                config.url_buffer_secs = buffer;
            }
        }
        config
    }
}

/// Client over an [`ObjectStore`] adding caching, retry, and variant-group
/// semantics. Cheap to share behind an `Arc`.
pub struct ImageStoreClient {
    store: Arc<dyn ObjectStore>,
    cache: SignedUrlCache,
    config: StoreClientConfig,
    /// Per-path locks deduplicating concurrent refresh of the same stale
    /// path (single-flight).
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    /// Serializes batch refreshes so overlapping callers issue one request.
    refresh: Mutex<()>,
}

impl ImageStoreClient {
    pub fn new(store: Arc<dyn ObjectStore>, config: StoreClientConfig) -> Self {
        let cache = SignedUrlCache::new(config.url_buffer_secs);
        Self {
            store,
            cache,
            config,
            inflight: Mutex::new(HashMap::new()),
            refresh: Mutex::new(()),
        }
    }

    /// Retry `operation` on transient failures with exponential backoff.
    ///
    /// Validation/not-found style errors are not retried; only transport
    /// level failures (`Upload`, `SignedUrl`, `Request`) are.
    async fn with_retry<T, F, Fut>(&self, op: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e @ (Error::Upload(_) | Error::SignedUrl(_) | Error::Request(_)))
                    if attempt + 1 < self.config.max_retries =>
                {
                    let delay = self.config.retry_base_delay_ms * (1 << attempt);
                    warn!(op, attempt, delay_ms = delay, error = %e, "transient store failure, retrying");
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// Upload all three variants of a processed image under
    /// `{user_id}/{image_id}/{variant}.webp`.
    ///
    /// The group is atomic: on any failure, variants already uploaded are
    /// removed best-effort and the error propagates. Progress covers the
    /// three puts evenly.
    pub async fn upload_variants(
        &self,
        image: &ProcessedImage,
        user_id: &str,
        on_progress: Option<ProgressFn>,
    ) -> Result<UploadedImage> {
        let paths = StoragePaths::for_image(user_id, image.id);
        let mut uploaded: Vec<String> = Vec::with_capacity(3);

        for (index, kind) in VariantKind::ALL.iter().enumerate() {
            let path = paths.get(*kind);
            let variant = image.variant(*kind);
            debug!(
                image_id = %image.id,
                variant = %kind,
                storage_path = %path,
                size_bytes = variant.byte_size,
                "uploading variant"
            );

            let result = self
                .with_retry("put", || {
                    self.store.put(path, variant.bytes.clone(), "image/webp")
                })
                .await;

            if let Err(e) = result {
                if !uploaded.is_empty() {
                    warn!(
                        image_id = %image.id,
                        variant = %kind,
                        "variant upload failed, rolling back {} uploaded variant(s)",
                        uploaded.len()
                    );
                    if let Err(cleanup_err) = self.store.remove(&uploaded).await {
                        warn!(image_id = %image.id, error = %cleanup_err, "rollback cleanup failed");
                    }
                }
                return Err(e);
            }

            uploaded.push(path.to_string());
            if let Some(cb) = &on_progress {
                cb(((index + 1) * 100 / 3) as u8);
            }
        }

        info!(image_id = %image.id, "uploaded 3 variants");
        Ok(UploadedImage {
            id: image.id,
            storage_paths: paths,
            ocr_text: image.ocr_text.clone(),
            ocr_confidence: image.ocr_confidence,
            width: image.original.width,
            height: image.original.height,
            byte_sizes: [
                image.original.byte_size,
                image.medium.byte_size,
                image.thumb.byte_size,
            ],
            original_file_name: image.original_file_name.clone(),
        })
    }

    /// Get a signed URL for one path, serving from cache while fresh.
    ///
    /// Concurrent callers for the same stale path are deduplicated: one
    /// issues the request, the rest reuse its cached result.
    pub async fn get_signed_url(&self, path: &str) -> Result<String> {
        if let Some(url) = self.cache.get_fresh(path) {
            return Ok(url);
        }

        let path_lock = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(path.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = path_lock.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(url) = self.cache.get_fresh(path) {
            return Ok(url);
        }

        let ttl = self.config.url_ttl_secs;
        let result = self
            .with_retry("sign", || self.store.create_signed_url(path, ttl))
            .await;

        // Drop the single-flight entry whether signing succeeded or not, so
        // paths that fail to sign don't accumulate locks.
        self.inflight.lock().await.remove(path);

        let url = result?;
        self.cache.insert(path, &url, Self::now() + ttl as i64);
        Ok(url)
    }

    #[cfg(test)]
    async fn inflight_len(&self) -> usize {
        self.inflight.lock().await.len()
    }

    /// Get signed URLs for many paths.
    ///
    /// Cache hits are served directly; all misses go out in **one** batch
    /// request regardless of count. Paths the store could not sign are
    /// omitted from the result (callers degrade to unresolved
    /// placeholders).
    pub async fn get_signed_urls(&self, paths: &[String]) -> Result<HashMap<String, String>> {
        let mut resolved = HashMap::with_capacity(paths.len());
        let mut misses: Vec<String> = Vec::new();

        for path in paths {
            match self.cache.get_fresh(path) {
                Some(url) => {
                    resolved.insert(path.clone(), url);
                }
                None => misses.push(path.clone()),
            }
        }

        debug!(
            path_count = paths.len(),
            cache_hits = resolved.len(),
            "resolving signed URLs"
        );

        if misses.is_empty() {
            return Ok(resolved);
        }

        let _refresh = self.refresh.lock().await;

        // Re-check under the refresh lock: a concurrent batch may have
        // filled some of our misses.
        misses.retain(|path| match self.cache.get_fresh(path) {
            Some(url) => {
                resolved.insert(path.clone(), url);
                false
            }
            None => true,
        });

        if misses.is_empty() {
            return Ok(resolved);
        }

        let ttl = self.config.url_ttl_secs;
        let signed = self
            .with_retry("batch_sign", || {
                self.store.create_signed_urls(&misses, ttl)
            })
            .await?;

        let expires_at = Self::now() + ttl as i64;
        for entry in signed {
            self.cache.insert(&entry.path, &entry.url, expires_at);
            resolved.insert(entry.path, entry.url);
        }
        Ok(resolved)
    }

    /// Delete objects and purge their cache entries.
    pub async fn delete_objects(&self, paths: &[String]) -> Result<()> {
        self.with_retry("remove", || self.store.remove(paths)).await?;
        self.cache.purge(paths);
        Ok(())
    }

    /// Delete all three variants of an image.
    pub async fn delete_image(&self, paths: &StoragePaths) -> Result<()> {
        self.delete_objects(&paths.as_vec()).await
    }

    /// List object paths under a prefix (orphan inspection).
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        self.store.list(prefix).await
    }

    /// Drop every cached URL. Shutdown/test hook.
    pub fn clear_url_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryObjectStore;

    fn client_with_store() -> (Arc<MemoryObjectStore>, ImageStoreClient) {
        let store = Arc::new(MemoryObjectStore::new());
        let client = ImageStoreClient::new(store.clone(), StoreClientConfig::default());
        (store, client)
    }

    #[tokio::test]
    async fn test_signed_url_cached_within_window() {
        let (store, client) = client_with_store();
        store.put("p", vec![1], "image/webp").await.unwrap();

        let first = client.get_signed_url("p").await.unwrap();
        let second = client.get_signed_url("p").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.sign_request_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_object_not_retried() {
        let (_store, client) = client_with_store();
        let err = client.get_signed_url("nope").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_inflight_entry_released_on_failure() {
        let (store, client) = client_with_store();

        // A path that fails to sign must not leave a lock entry behind.
        assert!(client.get_signed_url("missing").await.is_err());
        assert_eq!(client.inflight_len().await, 0);

        store.put("p", vec![1], "image/webp").await.unwrap();
        client.get_signed_url("p").await.unwrap();
        assert_eq!(client.inflight_len().await, 0);
    }

    #[tokio::test]
    async fn test_delete_purges_cache() {
        let (store, client) = client_with_store();
        store.put("p", vec![1], "image/webp").await.unwrap();
        client.get_signed_url("p").await.unwrap();

        client.delete_objects(&["p".to_string()]).await.unwrap();
        assert!(!store.contains("p"));
        // Next lookup misses the cache and fails against the store.
        assert!(client.get_signed_url("p").await.is_err());
    }

    #[tokio::test]
    async fn test_clear_url_cache_forces_reissue() {
        let (store, client) = client_with_store();
        store.put("p", vec![1], "image/webp").await.unwrap();
        client.get_signed_url("p").await.unwrap();
        client.clear_url_cache();
        client.get_signed_url("p").await.unwrap();
        assert_eq!(store.sign_request_count(), 2);
    }

    #[tokio::test]
    async fn test_config_from_env_defaults() {
        let config = StoreClientConfig::from_env();
        assert_eq!(config.url_ttl_secs, SIGNED_URL_TTL_SECS);
        assert_eq!(config.url_buffer_secs, SIGNED_URL_BUFFER_SECS);
    }
}
