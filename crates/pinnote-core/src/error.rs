//! Error types for the pinnote image pipeline.

use thiserror::Error;

/// Result type alias using pinnote's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for pinnote operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any processing (unsupported type, too large)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Image bytes could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Re-encoding a variant failed
    #[error("Encode error: {0}")]
    Encode(String),

    /// OCR engine failure (callers downgrade this, never fatal)
    #[error("OCR error: {0}")]
    Ocr(String),

    /// Object upload failed (transport or permission)
    #[error("Upload error: {0}")]
    Upload(String),

    /// Signed URL issuance failed
    #[error("Signed URL error: {0}")]
    SignedUrl(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation cancelled cooperatively
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_validation() {
        let err = Error::Validation("file too large".to_string());
        assert_eq!(err.to_string(), "Validation error: file too large");
    }

    #[test]
    fn test_error_display_decode() {
        let err = Error::Decode("truncated JPEG".to_string());
        assert_eq!(err.to_string(), "Decode error: truncated JPEG");
    }

    #[test]
    fn test_error_display_upload() {
        let err = Error::Upload("connection reset".to_string());
        assert_eq!(err.to_string(), "Upload error: connection reset");
    }

    #[test]
    fn test_error_display_signed_url() {
        let err = Error::SignedUrl("bucket denied".to_string());
        assert_eq!(err.to_string(), "Signed URL error: bucket denied");
    }

    #[test]
    fn test_error_display_cancelled() {
        assert_eq!(Error::Cancelled.to_string(), "Operation cancelled");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
