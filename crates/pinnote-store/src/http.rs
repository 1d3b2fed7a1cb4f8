//! Hosted object-store backend over HTTP.
//!
//! Speaks the Supabase Storage object API: uploads, single and batch
//! signed-URL issuance, deletion, and prefix listing against a private
//! bucket. Authentication is a bearer API key; every request carries the
//! configured timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use pinnote_core::defaults::{
    ENV_STORE_API_KEY, ENV_STORE_BASE_URL, ENV_STORE_BUCKET, STORE_REQUEST_TIMEOUT_SECS,
};
use pinnote_core::{Error, Result, SignedUrl};

use crate::backend::ObjectStore;

/// Configuration for the hosted store backend.
#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// Storage API root, e.g. `https://xyz.supabase.co/storage/v1`.
    pub base_url: String,
    /// Bearer API key (service role or scoped key).
    pub api_key: String,
    /// Bucket holding image variants.
    pub bucket: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl HttpStoreConfig {
    /// Load from environment variables.
    ///
    /// Fails with `Error::Config` when the base URL or API key is missing;
    /// bucket defaults to `note-images`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var(ENV_STORE_BASE_URL)
            .map_err(|_| Error::Config(format!("{} is not set", ENV_STORE_BASE_URL)))?;
        let api_key = std::env::var(ENV_STORE_API_KEY)
            .map_err(|_| Error::Config(format!("{} is not set", ENV_STORE_API_KEY)))?;
        let bucket =
            std::env::var(ENV_STORE_BUCKET).unwrap_or_else(|_| "note-images".to_string());
        Ok(Self {
            base_url,
            api_key,
            bucket,
            request_timeout_secs: STORE_REQUEST_TIMEOUT_SECS,
        })
    }
}

#[derive(Serialize)]
struct SignRequest {
    #[serde(rename = "expiresIn")]
    expires_in: u64,
}

#[derive(Serialize)]
struct SignBatchRequest {
    #[serde(rename = "expiresIn")]
    expires_in: u64,
    paths: Vec<String>,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

#[derive(Deserialize)]
struct SignBatchRow {
    path: Option<String>,
    #[serde(rename = "signedURL")]
    signed_url: Option<String>,
    error: Option<String>,
}

#[derive(Serialize)]
struct RemoveRequest {
    prefixes: Vec<String>,
}

#[derive(Serialize)]
struct ListRequest {
    prefix: String,
    limit: u32,
}

#[derive(Deserialize)]
struct ListRow {
    name: String,
}

/// Supabase-storage-compatible [`ObjectStore`].
pub struct HttpObjectStore {
    client: Client,
    config: HttpStoreConfig,
}

impl HttpObjectStore {
    pub fn new(config: HttpStoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(HttpStoreConfig::from_env()?)
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/object/{}/{}",
            self.config.base_url, self.config.bucket, path
        )
    }

    /// The batch sign endpoint returns bucket-relative URLs; expand them
    /// against the API root.
    fn absolute(&self, signed: &str) -> String {
        if signed.starts_with("http://") || signed.starts_with("https://") {
            signed.to_string()
        } else {
            format!("{}{}", self.config.base_url, signed)
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        debug!(storage_path = %path, size_bytes = bytes.len(), "store: put");
        let response = self
            .client
            .post(self.object_url(path))
            .bearer_auth(&self.config.api_key)
            .header("content-type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await
            .map_err(|e| Error::Upload(format!("put {} failed: {}", path, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upload(format!(
                "put {} failed ({}): {}",
                path,
                status,
                body.trim()
            )));
        }
        Ok(())
    }

    async fn create_signed_url(&self, path: &str, ttl_secs: u64) -> Result<String> {
        let url = format!(
            "{}/object/sign/{}/{}",
            self.config.base_url, self.config.bucket, path
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&SignRequest {
                expires_in: ttl_secs,
            })
            .send()
            .await
            .map_err(|e| Error::SignedUrl(format!("sign {} failed: {}", path, e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("no object at {}", path)));
        }
        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::SignedUrl(format!("sign {} failed ({})", path, status)));
        }

        let body: SignResponse = response
            .json()
            .await
            .map_err(|e| Error::SignedUrl(format!("sign {} bad response: {}", path, e)))?;
        Ok(self.absolute(&body.signed_url))
    }

    async fn create_signed_urls(&self, paths: &[String], ttl_secs: u64) -> Result<Vec<SignedUrl>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/object/sign/{}", self.config.base_url, self.config.bucket);
        debug!(path_count = paths.len(), "store: batch sign");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&SignBatchRequest {
                expires_in: ttl_secs,
                paths: paths.to_vec(),
            })
            .send()
            .await
            .map_err(|e| Error::SignedUrl(format!("batch sign failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::SignedUrl(format!("batch sign failed ({})", status)));
        }

        let rows: Vec<SignBatchRow> = response
            .json()
            .await
            .map_err(|e| Error::SignedUrl(format!("batch sign bad response: {}", e)))?;

        let mut signed = Vec::with_capacity(rows.len());
        for row in rows {
            match (row.path, row.signed_url) {
                (Some(path), Some(url)) => signed.push(SignedUrl {
                    url: self.absolute(&url),
                    path,
                }),
                (path, _) => {
                    // Per-path failures degrade to unresolved placeholders
                    // downstream; don't fail the batch.
                    warn!(
                        storage_path = ?path,
                        error = ?row.error,
                        "batch sign row skipped"
                    );
                }
            }
        }
        Ok(signed)
    }

    async fn remove(&self, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = format!("{}/object/{}", self.config.base_url, self.config.bucket);
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.config.api_key)
            .json(&RemoveRequest {
                prefixes: paths.to_vec(),
            })
            .send()
            .await
            .map_err(|e| Error::Upload(format!("remove failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Upload(format!("remove failed ({})", status)));
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}/object/list/{}",
            self.config.base_url, self.config.bucket
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&ListRequest {
                prefix: prefix.to_string(),
                limit: 1000,
            })
            .send()
            .await
            .map_err(|e| Error::Request(format!("list failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Request(format!("list failed ({})", status)));
        }

        let rows: Vec<ListRow> = response
            .json()
            .await
            .map_err(|e| Error::Request(format!("list bad response: {}", e)))?;
        let prefix = prefix.trim_end_matches('/');
        Ok(rows
            .into_iter()
            .map(|r| {
                if prefix.is_empty() {
                    r.name
                } else {
                    format!("{}/{}", prefix, r.name)
                }
            })
            .collect())
    }
}
