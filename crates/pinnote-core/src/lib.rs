//! # pinnote-core
//!
//! Core types, error taxonomy, and validation for the pinnote image
//! ingestion pipeline.
//!
//! This crate provides the foundational data structures the other pinnote
//! crates depend on: the processed-image data model, the shared `Error`
//! enum, centralized default constants, structured-logging field names,
//! cooperative cancellation, and upload validation.

pub mod cancel;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod validation;

// Re-export commonly used types at crate root
pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use models::{
    ImageVariant, OcrOutcome, ProcessedImage, ProcessedPreview, ProgressFn, SignedUrl,
    StoragePaths, UploadedImage, VariantKind,
};
pub use validation::{detect_image_type, validate_upload, SUPPORTED_IMAGE_TYPES};
