//! Upload validation: declared type allowlist, size ceiling, and a magic
//! byte cross-check.
//!
//! Validation runs before any decode or I/O so a bad file fails fast and
//! cheaply. Layers:
//! 1. Size ceiling (no decode attempted for oversized files)
//! 2. Declared MIME type allowlist
//! 3. Magic-byte sniff: declared image types must actually look like an
//!    image on the wire

use crate::defaults::MAX_IMAGE_BYTES;
use crate::error::{Error, Result};

/// MIME types accepted for upload.
pub const SUPPORTED_IMAGE_TYPES: &[&str] =
    &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Detect the actual image MIME type from magic bytes.
///
/// Returns `None` when the bytes do not sniff as any known image format.
pub fn detect_image_type(data: &[u8]) -> Option<&'static str> {
    let kind = infer::get(data)?;
    if kind.matcher_type() == infer::MatcherType::Image {
        Some(kind.mime_type())
    } else {
        None
    }
}

/// Validate an upload's declared MIME type and size.
///
/// `max_bytes` is the configured ceiling (callers usually pass
/// [`MAX_IMAGE_BYTES`]). The size check runs first: an oversized file is
/// rejected without looking at its content.
pub fn validate_upload(data: &[u8], declared_mime: &str, max_bytes: usize) -> Result<()> {
    if data.len() > max_bytes {
        return Err(Error::Validation(format!(
            "File size {} exceeds maximum of {} bytes",
            data.len(),
            max_bytes
        )));
    }

    if !SUPPORTED_IMAGE_TYPES.contains(&declared_mime) {
        return Err(Error::Validation(format!(
            "Unsupported image type: {}",
            declared_mime
        )));
    }

    // Mismatch guard: declared image types have recognizable magic bytes.
    // Bytes that don't sniff as an image are mislabeled or corrupt; reject
    // them here instead of failing later in the decoder.
    if detect_image_type(data).is_none() {
        return Err(Error::Validation(format!(
            "File content does not match declared type {}",
            declared_mime
        )));
    }

    Ok(())
}
