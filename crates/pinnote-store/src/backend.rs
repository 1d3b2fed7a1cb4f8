//! Object storage backend trait.
//!
//! Implementations handle the actual storage and retrieval of variant
//! bytes. Paths are opaque keys (`{userId}/{imageId}/{variant}.webp`);
//! read access to the private bucket is granted only through time-limited
//! signed URLs.

use async_trait::async_trait;
use pinnote_core::{Result, SignedUrl};

/// Path-addressed private blob storage with signed-URL issuance.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store bytes under `path`, overwriting any existing object.
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    /// Issue a time-limited read URL for one object.
    async fn create_signed_url(&self, path: &str, ttl_secs: u64) -> Result<String>;

    /// Issue time-limited read URLs for many objects in one request.
    ///
    /// Paths the store cannot sign (missing objects) are omitted from the
    /// result rather than failing the whole batch.
    async fn create_signed_urls(&self, paths: &[String], ttl_secs: u64) -> Result<Vec<SignedUrl>>;

    /// Remove objects. Missing paths are not an error.
    async fn remove(&self, paths: &[String]) -> Result<()>;

    /// List object paths under a prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}
