//! Mock OCR engine for tests and OCR-less deployments.

use async_trait::async_trait;

use pinnote_core::{Error, OcrOutcome, Result};

use crate::ocr::OcrEngine;

/// [`OcrEngine`] returning a fixed outcome, optionally failing instead.
pub struct MockOcrEngine {
    outcome: OcrOutcome,
    fail: bool,
}

impl MockOcrEngine {
    /// Engine that always returns `outcome`.
    pub fn returning(outcome: OcrOutcome) -> Self {
        Self {
            outcome,
            fail: false,
        }
    }

    /// Engine that always fails.
    pub fn failing() -> Self {
        Self {
            outcome: OcrOutcome::empty(),
            fail: true,
        }
    }

    /// Engine that recognizes nothing (empty text, zero confidence).
    pub fn silent() -> Self {
        Self::returning(OcrOutcome::empty())
    }
}

#[async_trait]
impl OcrEngine for MockOcrEngine {
    async fn recognize(&self, _image: &[u8], _language: &str) -> Result<OcrOutcome> {
        if self.fail {
            Err(Error::Ocr("mock engine failure".to_string()))
        } else {
            Ok(self.outcome.clone())
        }
    }

    async fn health_check(&self) -> bool {
        !self.fail
    }

    fn name(&self) -> &str {
        "mock"
    }
}
