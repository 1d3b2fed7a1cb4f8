//! Upload orchestration: drives the processor and the store client for one
//! or many files behind a small state machine.
//!
//! States: `idle → processing → uploading → complete`, with a side
//! transition to `error` from any state. Processor progress maps to
//! [0, 60] of the unified percentage; store upload progress maps to
//! [60, 100]. Events are published on a broadcast channel (subscribe via
//! [`Uploader::events`]); the final result is also returned directly.
//!
//! Multi-file batches run sequentially by default: each decode holds a
//! full-resolution bitmap, so peak memory stays bounded by one file and
//! the progress signal stays linear. `UploadConfig.concurrency` raises the
//! bound to a fixed-size worker pool when callers opt in.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use pinnote_core::defaults::{
    PROGRESS_PROCESSING_CEILING, UPLOAD_CONCURRENCY, UPLOAD_EVENT_CAPACITY,
};
use pinnote_core::{CancelToken, Error, ProgressFn, Result, UploadedImage};
use pinnote_store::ImageStoreClient;

use crate::processor::{ImageProcessor, ImageUpload};

/// Upload state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadPhase {
    Idle,
    Processing,
    Uploading,
    Complete,
    Error,
}

/// One progress notification for UI code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadEvent {
    pub phase: UploadPhase,
    /// Unified percentage in [0, 100] across processing and uploading.
    pub percent: u8,
    /// Zero-based index of the file within the batch.
    pub file_index: usize,
    pub file_count: usize,
    pub file_name: String,
}

/// Configuration for [`Uploader`].
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Maximum files processed at once in a batch. 1 = strictly
    /// sequential.
    pub concurrency: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            concurrency: UPLOAD_CONCURRENCY,
        }
    }
}

/// Drives processor + store client and publishes state machine events.
pub struct Uploader {
    processor: Arc<ImageProcessor>,
    store: Arc<ImageStoreClient>,
    config: UploadConfig,
    events: broadcast::Sender<UploadEvent>,
}

impl Uploader {
    pub fn new(
        processor: Arc<ImageProcessor>,
        store: Arc<ImageStoreClient>,
        config: UploadConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(UPLOAD_EVENT_CAPACITY);
        Self {
            processor,
            store,
            config,
            events,
        }
    }

    /// Subscribe to upload events. Receivers created after an upload
    /// started miss earlier events.
    pub fn events(&self) -> broadcast::Receiver<UploadEvent> {
        self.events.subscribe()
    }

    fn emit(&self, phase: UploadPhase, percent: u8, index: usize, count: usize, name: &str) {
        // No receivers is fine; callers may rely on the return value only.
        let _ = self.events.send(UploadEvent {
            phase,
            percent,
            file_index: index,
            file_count: count,
            file_name: name.to_string(),
        });
    }

    /// Upload one file end to end.
    pub async fn upload(
        &self,
        upload: ImageUpload,
        user_id: &str,
        cancel: &CancelToken,
    ) -> Result<UploadedImage> {
        self.upload_indexed(upload, user_id, cancel, 0, 1).await
    }

    async fn upload_indexed(
        &self,
        upload: ImageUpload,
        user_id: &str,
        cancel: &CancelToken,
        index: usize,
        count: usize,
    ) -> Result<UploadedImage> {
        let name = upload.file_name.clone();
        let last_percent = Arc::new(AtomicU8::new(0));
        self.emit(UploadPhase::Idle, 0, index, count, &name);

        let result = self
            .run_stages(upload, user_id, cancel, index, count, &last_percent)
            .await;

        match &result {
            Ok(uploaded) => {
                self.emit(UploadPhase::Complete, 100, index, count, &name);
                info!(image_id = %uploaded.id, file_name = %name, "upload complete");
            }
            Err(e) => {
                self.emit(
                    UploadPhase::Error,
                    last_percent.load(Ordering::SeqCst),
                    index,
                    count,
                    &name,
                );
                warn!(file_name = %name, error = %e, "upload failed");
            }
        }
        result
    }

    async fn run_stages(
        &self,
        upload: ImageUpload,
        user_id: &str,
        cancel: &CancelToken,
        index: usize,
        count: usize,
        last_percent: &Arc<AtomicU8>,
    ) -> Result<UploadedImage> {
        let name = upload.file_name.clone();
        let ceiling = PROGRESS_PROCESSING_CEILING as u32;

        // Processing phase: processor progress scaled to [0, ceiling].
        let processing_progress: ProgressFn = {
            let events = self.events.clone();
            let name = name.clone();
            let last = last_percent.clone();
            Arc::new(move |p: u8| {
                let scaled = (p as u32 * ceiling / 100) as u8;
                last.store(scaled, Ordering::SeqCst);
                let _ = events.send(UploadEvent {
                    phase: UploadPhase::Processing,
                    percent: scaled,
                    file_index: index,
                    file_count: count,
                    file_name: name.clone(),
                });
            })
        };
        let processed = self
            .processor
            .process(&upload, Some(processing_progress), cancel)
            .await?;

        cancel.check()?;

        // Uploading phase: store progress scaled to [ceiling, 100].
        let uploading_progress: ProgressFn = {
            let events = self.events.clone();
            let name = name.clone();
            let last = last_percent.clone();
            Arc::new(move |p: u8| {
                let scaled = (ceiling + p as u32 * (100 - ceiling) / 100) as u8;
                last.store(scaled, Ordering::SeqCst);
                let _ = events.send(UploadEvent {
                    phase: UploadPhase::Uploading,
                    percent: scaled,
                    file_index: index,
                    file_count: count,
                    file_name: name.clone(),
                });
            })
        };
        self.store
            .upload_variants(&processed, user_id, Some(uploading_progress))
            .await
    }

    /// Upload a batch of files, returning per-file results in input order.
    ///
    /// Files run sequentially unless `concurrency > 1`, in which case at
    /// most that many pipelines run at once. Cancellation short-circuits
    /// files that have not started.
    pub async fn upload_many(
        &self,
        uploads: Vec<ImageUpload>,
        user_id: &str,
        cancel: &CancelToken,
    ) -> Vec<Result<UploadedImage>> {
        let count = uploads.len();

        if self.config.concurrency <= 1 {
            let mut results = Vec::with_capacity(count);
            for (index, upload) in uploads.into_iter().enumerate() {
                if cancel.is_cancelled() {
                    results.push(Err(Error::Cancelled));
                    continue;
                }
                results.push(
                    self.upload_indexed(upload, user_id, cancel, index, count)
                        .await,
                );
            }
            return results;
        }

        stream::iter(uploads.into_iter().enumerate())
            .map(|(index, upload)| async move {
                if cancel.is_cancelled() {
                    return Err(Error::Cancelled);
                }
                self.upload_indexed(upload, user_id, cancel, index, count)
                    .await
            })
            .buffered(self.config.concurrency)
            .collect()
            .await
    }
}
