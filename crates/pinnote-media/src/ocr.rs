//! OCR text extraction.
//!
//! The engine seam is the [`OcrEngine`] trait; the default implementation
//! shells out to `tesseract` with TSV output so word-level confidences are
//! available. Engine availability is probed lazily on first use and
//! memoized, so upload paths pay the probe cost once per process.
//!
//! OCR is an enhancement, never a blocking requirement: the
//! [`OcrExtractor`] wrapper swallows every engine failure into
//! `{text: "", confidence: 0}` and the pipeline proceeds.

use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::{NamedTempFile, TempDir};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use pinnote_core::defaults::{
    ENV_OCR_LANGUAGE, ENV_TESSERACT_PATH, OCR_CMD_TIMEOUT_SECS, OCR_LANGUAGE,
};
use pinnote_core::{Error, OcrOutcome, ProgressFn, Result};

/// Text-recognition engine seam.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize text in raw image bytes.
    async fn recognize(&self, image: &[u8], language: &str) -> Result<OcrOutcome>;

    /// Whether the engine is usable in this environment.
    async fn health_check(&self) -> bool;

    fn name(&self) -> &str;
}

/// Configuration for the tesseract subprocess engine.
#[derive(Debug, Clone)]
pub struct TesseractConfig {
    /// Binary name or absolute path.
    pub binary: String,
    /// Language pack selection passed to `-l`.
    pub language: String,
    /// Per-invocation timeout in seconds.
    pub cmd_timeout_secs: u64,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary: "tesseract".to_string(),
            language: OCR_LANGUAGE.to_string(),
            cmd_timeout_secs: OCR_CMD_TIMEOUT_SECS,
        }
    }
}

impl TesseractConfig {
    /// Load from environment variables with fallback to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var(ENV_TESSERACT_PATH) {
            config.binary = path;
        }
        if let Ok(lang) = std::env::var(ENV_OCR_LANGUAGE) {
            config.language = lang;
        }
        config
    }
}

/// Run a command that outputs to files rather than stdout.
async fn run_cmd_status(cmd: &mut Command, timeout_secs: u64) -> Result<()> {
    let output = tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| Error::Ocr(format!("OCR command timed out after {}s", timeout_secs)))?
        .map_err(|e| Error::Ocr(format!("Failed to execute OCR command: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Ocr(format!(
            "OCR command failed (exit {}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}

/// Tesseract subprocess [`OcrEngine`].
pub struct TesseractEngine {
    config: TesseractConfig,
    /// Memoized availability probe result.
    available: OnceCell<bool>,
}

impl TesseractEngine {
    pub fn new(config: TesseractConfig) -> Self {
        Self {
            config,
            available: OnceCell::new(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(TesseractConfig::from_env())
    }

    async fn probe(&self) -> bool {
        let ok = match Command::new(&self.config.binary)
            .arg("--version")
            .output()
            .await
        {
            Ok(output) => output.status.success(),
            Err(_) => false,
        };
        if !ok {
            warn!(binary = %self.config.binary, "tesseract not available, OCR disabled");
        }
        ok
    }

    async fn is_available(&self) -> bool {
        *self.available.get_or_init(|| self.probe()).await
    }

    /// Parse tesseract TSV output into joined text plus mean word
    /// confidence scaled to [0, 1].
    fn parse_tsv(tsv: &str) -> OcrOutcome {
        let mut lines: Vec<String> = Vec::new();
        let mut current_line = String::new();
        let mut last_line_key: Option<(u32, u32, u32, u32)> = None;
        let mut conf_sum = 0.0f64;
        let mut word_count = 0usize;

        for row in tsv.lines().skip(1) {
            let cols: Vec<&str> = row.split('\t').collect();
            if cols.len() < 12 || cols[0] != "5" {
                continue;
            }
            let conf: f64 = cols[10].parse().unwrap_or(-1.0);
            let word = cols[11].trim();
            if conf < 0.0 || word.is_empty() {
                continue;
            }

            let key = (
                cols[1].parse().unwrap_or(0),
                cols[2].parse().unwrap_or(0),
                cols[3].parse().unwrap_or(0),
                cols[4].parse().unwrap_or(0),
            );
            if last_line_key.is_some() && last_line_key != Some(key) {
                lines.push(std::mem::take(&mut current_line));
            }
            last_line_key = Some(key);

            if !current_line.is_empty() {
                current_line.push(' ');
            }
            current_line.push_str(word);
            conf_sum += conf;
            word_count += 1;
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }

        if word_count == 0 {
            return OcrOutcome::empty();
        }
        let confidence = ((conf_sum / word_count as f64) / 100.0).clamp(0.0, 1.0) as f32;
        OcrOutcome {
            text: lines.join("\n"),
            confidence,
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn recognize(&self, image: &[u8], language: &str) -> Result<OcrOutcome> {
        if image.is_empty() {
            return Err(Error::Ocr("Cannot OCR empty image data".to_string()));
        }
        if !self.is_available().await {
            return Err(Error::Ocr("tesseract is not available".to_string()));
        }

        // Write image to a temp file; tesseract reads from disk.
        let mut input = NamedTempFile::new()
            .map_err(|e| Error::Ocr(format!("Failed to create temp file: {}", e)))?;
        input
            .write_all(image)
            .map_err(|e| Error::Ocr(format!("Failed to write temp file: {}", e)))?;

        let out_dir =
            TempDir::new().map_err(|e| Error::Ocr(format!("Failed to create temp dir: {}", e)))?;
        let out_base = out_dir.path().join("ocr");

        debug!(language, size_bytes = image.len(), "running tesseract");
        run_cmd_status(
            Command::new(&self.config.binary)
                .arg(input.path())
                .arg(&out_base)
                .arg("-l")
                .arg(language)
                .arg("tsv"),
            self.config.cmd_timeout_secs,
        )
        .await?;

        let tsv_path = out_base.with_extension("tsv");
        let tsv = std::fs::read_to_string(&tsv_path)
            .map_err(|e| Error::Ocr(format!("Failed to read OCR output: {}", e)))?;

        Ok(Self::parse_tsv(&tsv))
    }

    async fn health_check(&self) -> bool {
        self.is_available().await
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

/// Failure-swallowing wrapper over an [`OcrEngine`].
pub struct OcrExtractor {
    engine: std::sync::Arc<dyn OcrEngine>,
    language: String,
}

impl OcrExtractor {
    pub fn new(engine: std::sync::Arc<dyn OcrEngine>, language: impl Into<String>) -> Self {
        Self {
            engine,
            language: language.into(),
        }
    }

    /// Extract text from image bytes.
    ///
    /// Any engine failure degrades to empty text with zero confidence; it
    /// is logged but never propagated. Progress is reported at the start
    /// and end of the recognition pass (the engine itself is opaque), so
    /// the callback always completes at 100 even on failure.
    pub async fn extract_text(&self, image: &[u8], on_progress: Option<ProgressFn>) -> OcrOutcome {
        if let Some(cb) = &on_progress {
            cb(0);
        }
        let outcome = match self.engine.recognize(image, &self.language).await {
            Ok(outcome) => {
                debug!(
                    engine = self.engine.name(),
                    ocr_confidence = outcome.confidence,
                    "OCR complete"
                );
                outcome
            }
            Err(e) => {
                warn!(engine = self.engine.name(), error = %e, "OCR failed, continuing without text");
                OcrOutcome::empty()
            }
        };
        if let Some(cb) = &on_progress {
            cb(100);
        }
        outcome
    }
}
