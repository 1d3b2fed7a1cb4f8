//! Centralized default constants for the pinnote image pipeline.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates reference these constants instead of defining their own magic
//! numbers. When adding new constants, place them in the appropriate section
//! and document the rationale for the chosen value.

// =============================================================================
// VARIANT GEOMETRY
// =============================================================================

/// Maximum width of the `original` variant in pixels.
///
/// 1920 matches the widest common display; anything larger buys nothing for
/// note embedding and inflates storage.
pub const MAX_ORIGINAL_WIDTH: u32 = 1920;

/// Maximum width of the `medium` variant in pixels (inline display size).
pub const MAX_MEDIUM_WIDTH: u32 = 800;

/// Maximum width of the `thumb` variant in pixels (list/grid previews).
pub const MAX_THUMB_WIDTH: u32 = 300;

/// Encoder quality for the `original` variant (0.0–1.0).
pub const QUALITY_ORIGINAL: f32 = 0.9;

/// Encoder quality for the `medium` variant.
pub const QUALITY_MEDIUM: f32 = 0.85;

/// Encoder quality for the `thumb` variant.
pub const QUALITY_THUMB: f32 = 0.8;

// =============================================================================
// UPLOAD VALIDATION
// =============================================================================

/// Maximum accepted upload size in bytes (10 MiB).
///
/// Enforced before any decode work so oversized files fail fast.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Environment variable overriding the upload size ceiling.
pub const ENV_MAX_IMAGE_BYTES: &str = "PINNOTE_MAX_IMAGE_BYTES";

// =============================================================================
// OCR
// =============================================================================

/// Minimum engine confidence for extracted text to be kept.
///
/// Below this, OCR output is discarded (not stored) rather than polluting
/// search with noise. Configurable via `ProcessorConfig`.
pub const OCR_CONFIDENCE_THRESHOLD: f32 = 0.3;

/// Default tesseract language pack selection.
pub const OCR_LANGUAGE: &str = "tur+eng";

/// Environment variable overriding the confidence threshold.
pub const ENV_OCR_CONFIDENCE: &str = "PINNOTE_OCR_CONFIDENCE_THRESHOLD";

/// Per-invocation timeout for the OCR subprocess in seconds.
pub const OCR_CMD_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding the OCR language.
pub const ENV_OCR_LANGUAGE: &str = "PINNOTE_OCR_LANGUAGE";

/// Environment variable overriding the tesseract binary path.
pub const ENV_TESSERACT_PATH: &str = "PINNOTE_TESSERACT_PATH";

// =============================================================================
// SIGNED URLS
// =============================================================================

/// Validity window requested for signed URLs, in seconds (1 hour).
pub const SIGNED_URL_TTL_SECS: u64 = 3600;

/// Freshness buffer in seconds: a cached URL is reused only while
/// `now + buffer < expires_at`, so callers never receive a URL that
/// expires within the buffer window.
pub const SIGNED_URL_BUFFER_SECS: u64 = 300;

/// Environment variable overriding the signed-URL TTL.
pub const ENV_SIGNED_URL_TTL: &str = "PINNOTE_SIGNED_URL_TTL_SECS";

/// Environment variable overriding the freshness buffer.
pub const ENV_SIGNED_URL_BUFFER: &str = "PINNOTE_SIGNED_URL_BUFFER_SECS";

// =============================================================================
// OBJECT STORE
// =============================================================================

/// Per-request timeout for object-store HTTP calls in seconds.
pub const STORE_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum retry attempts for transient upload / signed-URL failures.
pub const STORE_MAX_RETRIES: u32 = 3;

/// Base delay for exponential retry backoff in milliseconds.
pub const STORE_RETRY_BASE_DELAY_MS: u64 = 250;

/// Environment variable for the hosted store base URL.
pub const ENV_STORE_BASE_URL: &str = "PINNOTE_STORE_BASE_URL";

/// Environment variable for the hosted store API key.
pub const ENV_STORE_API_KEY: &str = "PINNOTE_STORE_API_KEY";

/// Environment variable for the hosted store bucket name.
pub const ENV_STORE_BUCKET: &str = "PINNOTE_STORE_BUCKET";

// =============================================================================
// UPLOAD ORCHESTRATION
// =============================================================================

/// Processing stage share of the unified progress bar (percent).
///
/// Image processing maps to [0, 60]; uploading maps to [60, 100].
pub const PROGRESS_PROCESSING_CEILING: u8 = 60;

/// Default batch upload concurrency. Sequential by default: each decode
/// holds a full-resolution bitmap, so peak memory is bounded by one file,
/// and a single linear progress signal stays meaningful.
pub const UPLOAD_CONCURRENCY: usize = 1;

/// Broadcast channel capacity for upload events.
pub const UPLOAD_EVENT_CAPACITY: usize = 64;
