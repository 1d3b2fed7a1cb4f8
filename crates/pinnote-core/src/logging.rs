//! Structured logging schema and field name constants for pinnote.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "codec", "ocr", "processor", "store", "content", "upload"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "process", "upload_variants", "sign_urls", "to_editor_form"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Image UUID being operated on.
pub const IMAGE_ID: &str = "image_id";

/// Variant kind ("original", "medium", "thumb").
pub const VARIANT: &str = "variant";

/// Object-store key affected.
pub const STORAGE_PATH: &str = "storage_path";

/// Original upload filename.
pub const FILE_NAME: &str = "file_name";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Byte length of a payload.
pub const SIZE_BYTES: &str = "size_bytes";

/// Number of paths in a batch signed-URL request.
pub const PATH_COUNT: &str = "path_count";

/// Number of cache hits in a batch lookup.
pub const CACHE_HITS: &str = "cache_hits";

/// OCR confidence score (0.0–1.0).
pub const OCR_CONFIDENCE: &str = "ocr_confidence";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Initialize tracing for binaries and tests embedding the library.
///
/// Respects `RUST_LOG`; defaults to `info` when unset. Safe to call more
/// than once (subsequent calls are no-ops).
pub fn init() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
