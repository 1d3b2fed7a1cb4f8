//! # pinnote-media
//!
//! The image side of the pinnote pipeline:
//! - [`codec`]: decode + downscale + WebP re-encode behind the
//!   [`ImageCodec`] trait (pure, no I/O)
//! - [`ocr`]: text extraction behind the [`OcrEngine`] trait, with a
//!   tesseract subprocess engine and a failure-swallowing extractor
//! - [`processor`]: the staged pipeline producing a `ProcessedImage` with
//!   unified progress reporting
//! - [`upload`]: the upload state machine driving processor + store for
//!   one or many files
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pinnote_media::{ImageProcessor, ProcessorConfig, Uploader, UploadConfig};
//! use pinnote_media::ocr::{OcrExtractor, TesseractEngine};
//! use pinnote_store::{ImageStoreClient, MemoryObjectStore, StoreClientConfig};
//!
//! let store = Arc::new(ImageStoreClient::new(
//!     Arc::new(MemoryObjectStore::new()),
//!     StoreClientConfig::default(),
//! ));
//! let processor = Arc::new(ImageProcessor::with_tesseract(ProcessorConfig::default()));
//! let uploader = Uploader::new(processor, store, UploadConfig::default());
//!
//! let uploaded = uploader.upload(upload, "user-1", &Default::default()).await?;
//! ```

pub mod codec;
pub mod mock;
pub mod ocr;
pub mod processor;
pub mod upload;

pub use codec::{ImageCodec, WebpCodec};
pub use ocr::{OcrEngine, OcrExtractor, TesseractConfig, TesseractEngine};
pub use processor::{ImageProcessor, ImageUpload, ProcessorConfig};
pub use upload::{UploadConfig, UploadEvent, UploadPhase, Uploader};
