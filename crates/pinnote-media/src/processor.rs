//! Staged image processing pipeline.
//!
//! Stage order is fixed: validate → original variant → medium variant →
//! thumb variant → OCR → assemble. Stages run strictly sequentially so the
//! progress percentage advances linearly (validation 0%, variants 10–60%,
//! OCR 60–100%) and a caller can render a single progress bar across the
//! heterogeneous work. Cancellation is checked between stages.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use pinnote_core::defaults::{ENV_MAX_IMAGE_BYTES, ENV_OCR_CONFIDENCE, MAX_IMAGE_BYTES, OCR_CONFIDENCE_THRESHOLD, OCR_LANGUAGE};
use pinnote_core::{
    validate_upload, CancelToken, ImageVariant, ProcessedImage, ProcessedPreview, ProgressFn,
    Result, VariantKind,
};

use crate::codec::{ImageCodec, WebpCodec};
use crate::ocr::{OcrExtractor, TesseractEngine};

/// A raw file entering the pipeline.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    /// Declared MIME type; cross-checked against magic bytes during
    /// validation.
    pub mime_type: String,
}

/// Configuration for [`ImageProcessor`].
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Upload size ceiling in bytes.
    pub max_bytes: usize,
    /// Minimum OCR confidence for extracted text to be kept.
    pub ocr_confidence_threshold: f32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_bytes: MAX_IMAGE_BYTES,
            ocr_confidence_threshold: OCR_CONFIDENCE_THRESHOLD,
        }
    }
}

impl ProcessorConfig {
    /// Load from environment variables with fallback to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(val) = std::env::var(ENV_MAX_IMAGE_BYTES) {
            if let Ok(bytes) = val.parse::<usize>() {
                config.max_bytes = bytes;
            } else {
                tracing::warn!(value = %val, "Invalid max image bytes, using default");
            }
        }
        if let Ok(val) = std::env::var(ENV_OCR_CONFIDENCE) {
            if let Ok(threshold) = val.parse::<f32>() {
                config.ocr_confidence_threshold = threshold.clamp(0.0, 1.0);
            }
        }
        config
    }
}

/// Progress breakpoints across the stage sequence.
const PROGRESS_VALIDATED: u8 = 10;
const PROGRESS_ORIGINAL: u8 = 30;
const PROGRESS_MEDIUM: u8 = 45;
const PROGRESS_THUMB: u8 = 60;
const PROGRESS_DONE: u8 = 100;

/// Orchestrates codec + OCR into a single staged pipeline.
pub struct ImageProcessor {
    codec: Arc<dyn ImageCodec>,
    ocr: OcrExtractor,
    config: ProcessorConfig,
}

impl ImageProcessor {
    pub fn new(codec: Arc<dyn ImageCodec>, ocr: OcrExtractor, config: ProcessorConfig) -> Self {
        Self { codec, ocr, config }
    }

    /// Default wiring: WebP codec + tesseract engine from the environment.
    pub fn with_tesseract(config: ProcessorConfig) -> Self {
        let engine = TesseractEngine::from_env();
        let language = engine_language();
        Self::new(
            Arc::new(WebpCodec::new()),
            OcrExtractor::new(Arc::new(engine), language),
            config,
        )
    }

    fn report(on_progress: &Option<ProgressFn>, percent: u8) {
        if let Some(cb) = on_progress {
            cb(percent);
        }
    }

    /// Run the full pipeline on one upload.
    ///
    /// Fails with `Error::Validation` before any decode work when the
    /// declared type is unsupported or the file exceeds the size ceiling.
    /// OCR failure never fails the pipeline; sub-threshold OCR output is
    /// discarded, not stored.
    pub async fn process(
        &self,
        upload: &ImageUpload,
        on_progress: Option<ProgressFn>,
        cancel: &CancelToken,
    ) -> Result<ProcessedImage> {
        let started = std::time::Instant::now();
        Self::report(&on_progress, 0);
        validate_upload(&upload.bytes, &upload.mime_type, self.config.max_bytes)?;
        Self::report(&on_progress, PROGRESS_VALIDATED);

        let id = Uuid::new_v4();
        debug!(image_id = %id, file_name = %upload.file_name, "processing image");

        cancel.check()?;
        let original = self.variant(&upload.bytes, VariantKind::Original)?;
        Self::report(&on_progress, PROGRESS_ORIGINAL);

        cancel.check()?;
        let medium = self.variant(&upload.bytes, VariantKind::Medium)?;
        Self::report(&on_progress, PROGRESS_MEDIUM);

        cancel.check()?;
        let thumb = self.variant(&upload.bytes, VariantKind::Thumb)?;
        Self::report(&on_progress, PROGRESS_THUMB);

        cancel.check()?;
        // OCR spans the [60, 100] slice of the overall percentage.
        let ocr_progress: Option<ProgressFn> = on_progress.as_ref().map(|cb| {
            let cb = cb.clone();
            Arc::new(move |p: u8| {
                let span = (PROGRESS_DONE - PROGRESS_THUMB) as u32;
                cb((PROGRESS_THUMB as u32 + p as u32 * span / 100) as u8);
            }) as ProgressFn
        });
        let ocr = self.ocr.extract_text(&upload.bytes, ocr_progress).await;
        let ocr_text = if ocr.confidence >= self.config.ocr_confidence_threshold {
            Some(ocr.text)
        } else {
            None
        };
        Self::report(&on_progress, PROGRESS_DONE);

        info!(
            image_id = %id,
            file_name = %upload.file_name,
            ocr_confidence = ocr.confidence,
            duration_ms = started.elapsed().as_millis() as u64,
            "image processed"
        );

        Ok(ProcessedImage {
            id,
            original,
            medium,
            thumb,
            ocr_text,
            ocr_confidence: ocr.confidence,
            original_file_name: upload.file_name.clone(),
            mime_type: upload.mime_type.clone(),
        })
    }

    /// Lightweight path: validate and produce only a thumbnail, skipping
    /// OCR and the other variants. Used for instant UI feedback while the
    /// full pipeline runs.
    pub fn process_quick(&self, upload: &ImageUpload) -> Result<ProcessedPreview> {
        validate_upload(&upload.bytes, &upload.mime_type, self.config.max_bytes)?;
        let thumb = self.variant(&upload.bytes, VariantKind::Thumb)?;
        Ok(ProcessedPreview {
            id: Uuid::new_v4(),
            thumb,
            original_file_name: upload.file_name.clone(),
            mime_type: upload.mime_type.clone(),
        })
    }

    fn variant(&self, bytes: &[u8], kind: VariantKind) -> Result<ImageVariant> {
        self.codec.resize(bytes, kind.max_width(), kind.quality())
    }
}

fn engine_language() -> String {
    std::env::var(pinnote_core::defaults::ENV_OCR_LANGUAGE)
        .unwrap_or_else(|_| OCR_LANGUAGE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockOcrEngine;
    use pinnote_core::{defaults, Error, OcrOutcome};
    use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut buf = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut buf),
            image::ImageFormat::Png,
        )
        .unwrap();
        buf
    }

    fn upload(width: u32, height: u32) -> ImageUpload {
        ImageUpload {
            bytes: png(width, height),
            file_name: "photo.png".to_string(),
            mime_type: "image/png".to_string(),
        }
    }

    fn processor_with_ocr(outcome: OcrOutcome) -> ImageProcessor {
        ImageProcessor::new(
            Arc::new(WebpCodec::new()),
            OcrExtractor::new(Arc::new(MockOcrEngine::returning(outcome)), "eng"),
            ProcessorConfig::default(),
        )
    }

    /// Codec wrapper counting resize calls, for validation-precedence
    /// assertions.
    struct CountingCodec {
        inner: WebpCodec,
        calls: AtomicUsize,
    }

    impl ImageCodec for CountingCodec {
        fn resize(
            &self,
            input: &[u8],
            max_width: u32,
            quality: f32,
        ) -> Result<ImageVariant> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.resize(input, max_width, quality)
        }
    }

    #[tokio::test]
    async fn test_three_variants_with_bounded_widths() {
        let processor = processor_with_ocr(OcrOutcome::empty());
        let result = processor
            .process(&upload(2400, 1200), None, &CancelToken::new())
            .await
            .unwrap();

        assert!(result.original.width <= defaults::MAX_ORIGINAL_WIDTH);
        assert!(result.medium.width <= defaults::MAX_MEDIUM_WIDTH);
        assert!(result.thumb.width <= defaults::MAX_THUMB_WIDTH);
        assert_eq!(result.original.width, 1920);
        assert_eq!(result.medium.width, 800);
        assert_eq!(result.thumb.width, 300);
    }

    #[tokio::test]
    async fn test_small_source_never_upscaled() {
        let processor = processor_with_ocr(OcrOutcome::empty());
        let result = processor
            .process(&upload(150, 100), None, &CancelToken::new())
            .await
            .unwrap();
        for kind in VariantKind::ALL {
            assert_eq!(result.variant(kind).width, 150);
        }
    }

    #[tokio::test]
    async fn test_ocr_above_threshold_kept() {
        let processor = processor_with_ocr(OcrOutcome {
            text: "grocery list".to_string(),
            confidence: 0.82,
        });
        let result = processor
            .process(&upload(100, 100), None, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(result.ocr_text.as_deref(), Some("grocery list"));
        assert!((result.ocr_confidence - 0.82).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_ocr_below_threshold_discarded() {
        let processor = processor_with_ocr(OcrOutcome {
            text: "n0ise".to_string(),
            confidence: 0.2,
        });
        let result = processor
            .process(&upload(100, 100), None, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(result.ocr_text, None);
        // Confidence is still recorded even when the text is discarded.
        assert!((result.ocr_confidence - 0.2).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_ocr_engine_failure_degrades() {
        let processor = ImageProcessor::new(
            Arc::new(WebpCodec::new()),
            OcrExtractor::new(Arc::new(MockOcrEngine::failing()), "eng"),
            ProcessorConfig::default(),
        );
        let result = processor
            .process(&upload(100, 100), None, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(result.ocr_text, None);
        assert_eq!(result.ocr_confidence, 0.0);
    }

    #[tokio::test]
    async fn test_oversized_file_rejected_before_decode() {
        let codec = Arc::new(CountingCodec {
            inner: WebpCodec::new(),
            calls: AtomicUsize::new(0),
        });
        let processor = ImageProcessor::new(
            codec.clone(),
            OcrExtractor::new(Arc::new(MockOcrEngine::silent()), "eng"),
            ProcessorConfig {
                max_bytes: 1024,
                ..ProcessorConfig::default()
            },
        );
        let big = ImageUpload {
            bytes: vec![0u8; 2048],
            file_name: "big.png".to_string(),
            mime_type: "image/png".to_string(),
        };
        let err = processor
            .process(&big, None, &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(codec.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_type_rejected() {
        let processor = processor_with_ocr(OcrOutcome::empty());
        let bad = ImageUpload {
            bytes: png(10, 10),
            file_name: "doc.tiff".to_string(),
            mime_type: "image/tiff".to_string(),
        };
        let err = processor
            .process(&bad, None, &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_progress_is_monotone_and_complete() {
        let processor = processor_with_ocr(OcrOutcome::empty());
        let last = Arc::new(AtomicU8::new(0));
        let seen = last.clone();
        let cb: ProgressFn = Arc::new(move |p| {
            let prev = seen.swap(p, Ordering::SeqCst);
            assert!(p >= prev, "progress went backwards: {} -> {}", prev, p);
        });
        processor
            .process(&upload(640, 480), Some(cb), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(last.load(Ordering::SeqCst), 100);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_pipeline() {
        let processor = processor_with_ocr(OcrOutcome::empty());
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = processor
            .process(&upload(100, 100), None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_process_quick_produces_thumb_only() {
        let processor = processor_with_ocr(OcrOutcome::empty());
        let preview = processor.process_quick(&upload(900, 600)).unwrap();
        assert_eq!(preview.thumb.width, 300);
        assert_eq!(preview.original_file_name, "photo.png");
    }

    #[test]
    fn test_config_from_env_defaults() {
        let config = ProcessorConfig::from_env();
        assert_eq!(config.max_bytes, MAX_IMAGE_BYTES);
        assert!((config.ocr_confidence_threshold - OCR_CONFIDENCE_THRESHOLD).abs() < 1e-6);
    }
}
