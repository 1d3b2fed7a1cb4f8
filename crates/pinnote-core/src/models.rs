//! Data model for the image ingestion pipeline.
//!
//! Every image attached to a note exists as three encoded renditions
//! (original, medium, thumb) keyed under a single UUID. The types here flow
//! through the pipeline in order: raw upload → [`ProcessedImage`] →
//! [`UploadedImage`] → placeholder token in note content.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;

/// Progress callback reporting a percentage in [0, 100].
pub type ProgressFn = std::sync::Arc<dyn Fn(u8) + Send + Sync>;

/// One encoded rendition of an uploaded image. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageVariant {
    /// Encoded WebP bytes.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Cached `bytes.len()`, kept so metadata survives after bytes are
    /// dropped post-upload.
    pub byte_size: usize,
}

impl ImageVariant {
    pub fn new(bytes: Vec<u8>, width: u32, height: u32) -> Self {
        let byte_size = bytes.len();
        Self {
            bytes,
            width,
            height,
            byte_size,
        }
    }
}

/// The three renditions produced for every image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    Original,
    Medium,
    Thumb,
}

impl VariantKind {
    /// All kinds in pipeline generation order.
    pub const ALL: [VariantKind; 3] = [VariantKind::Original, VariantKind::Medium, VariantKind::Thumb];

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Original => "original",
            VariantKind::Medium => "medium",
            VariantKind::Thumb => "thumb",
        }
    }

    /// Configured maximum width for this kind.
    pub fn max_width(&self) -> u32 {
        match self {
            VariantKind::Original => defaults::MAX_ORIGINAL_WIDTH,
            VariantKind::Medium => defaults::MAX_MEDIUM_WIDTH,
            VariantKind::Thumb => defaults::MAX_THUMB_WIDTH,
        }
    }

    /// Default encoder quality for this kind.
    pub fn quality(&self) -> f32 {
        match self {
            VariantKind::Original => defaults::QUALITY_ORIGINAL,
            VariantKind::Medium => defaults::QUALITY_MEDIUM,
            VariantKind::Thumb => defaults::QUALITY_THUMB,
        }
    }
}

impl std::fmt::Display for VariantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw OCR engine output before confidence gating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrOutcome {
    pub text: String,
    /// Engine confidence in [0.0, 1.0].
    pub confidence: f32,
}

impl OcrOutcome {
    /// The degraded outcome used whenever the engine fails or is absent.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
        }
    }
}

/// Output of the full image processing pipeline.
///
/// Invariants: all three variants are present; each variant's width is at
/// most its configured maximum; `ocr_text` is `Some` only when
/// `ocr_confidence` met the configured threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedImage {
    pub id: Uuid,
    pub original: ImageVariant,
    pub medium: ImageVariant,
    pub thumb: ImageVariant,
    pub ocr_text: Option<String>,
    pub ocr_confidence: f32,
    pub original_file_name: String,
    /// Declared MIME type of the *input* file (variants are always WebP).
    pub mime_type: String,
}

impl ProcessedImage {
    pub fn variant(&self, kind: VariantKind) -> &ImageVariant {
        match kind {
            VariantKind::Original => &self.original,
            VariantKind::Medium => &self.medium,
            VariantKind::Thumb => &self.thumb,
        }
    }
}

/// Output of the lightweight quick-processing path: a thumbnail only, for
/// instant UI feedback while the full pipeline runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedPreview {
    pub id: Uuid,
    pub thumb: ImageVariant,
    pub original_file_name: String,
    pub mime_type: String,
}

/// Object-store keys for one image's variant group.
///
/// Paths are opaque keys of the form `{userId}/{imageId}/{variant}.webp`,
/// never raw URLs: the backing bucket is private.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoragePaths {
    pub original: String,
    pub medium: String,
    pub thumb: String,
}

impl StoragePaths {
    /// Build the canonical path group for an image owned by `user_id`.
    pub fn for_image(user_id: &str, image_id: Uuid) -> Self {
        let build = |kind: VariantKind| format!("{}/{}/{}.webp", user_id, image_id, kind.as_str());
        Self {
            original: build(VariantKind::Original),
            medium: build(VariantKind::Medium),
            thumb: build(VariantKind::Thumb),
        }
    }

    pub fn get(&self, kind: VariantKind) -> &str {
        match kind {
            VariantKind::Original => &self.original,
            VariantKind::Medium => &self.medium,
            VariantKind::Thumb => &self.thumb,
        }
    }

    /// Paths in generation order, for batch store operations.
    pub fn as_vec(&self) -> Vec<String> {
        vec![
            self.original.clone(),
            self.medium.clone(),
            self.thumb.clone(),
        ]
    }
}

/// Result of persisting a [`ProcessedImage`] to the object store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedImage {
    pub id: Uuid,
    pub storage_paths: StoragePaths,
    pub ocr_text: Option<String>,
    pub ocr_confidence: f32,
    /// Dimensions of the `original` variant.
    pub width: u32,
    pub height: u32,
    /// Encoded byte sizes in [original, medium, thumb] order.
    pub byte_sizes: [usize; 3],
    pub original_file_name: String,
}

/// One row of a batch signed-URL issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUrl {
    pub path: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_kind_strings() {
        assert_eq!(VariantKind::Original.as_str(), "original");
        assert_eq!(VariantKind::Medium.as_str(), "medium");
        assert_eq!(VariantKind::Thumb.as_str(), "thumb");
    }

    #[test]
    fn test_variant_kind_widths_match_defaults() {
        assert_eq!(VariantKind::Original.max_width(), defaults::MAX_ORIGINAL_WIDTH);
        assert_eq!(VariantKind::Medium.max_width(), defaults::MAX_MEDIUM_WIDTH);
        assert_eq!(VariantKind::Thumb.max_width(), defaults::MAX_THUMB_WIDTH);
    }

    #[test]
    fn test_storage_paths_shape() {
        let id = Uuid::new_v4();
        let paths = StoragePaths::for_image("user-1", id);
        assert_eq!(paths.original, format!("user-1/{}/original.webp", id));
        assert_eq!(paths.medium, format!("user-1/{}/medium.webp", id));
        assert_eq!(paths.thumb, format!("user-1/{}/thumb.webp", id));
    }

    #[test]
    fn test_storage_paths_as_vec_order() {
        let id = Uuid::new_v4();
        let paths = StoragePaths::for_image("u", id);
        let v = paths.as_vec();
        assert_eq!(v.len(), 3);
        assert!(v[0].ends_with("original.webp"));
        assert!(v[1].ends_with("medium.webp"));
        assert!(v[2].ends_with("thumb.webp"));
    }

    #[test]
    fn test_image_variant_byte_size() {
        let v = ImageVariant::new(vec![1, 2, 3], 10, 5);
        assert_eq!(v.byte_size, 3);
    }

    #[test]
    fn test_ocr_outcome_empty() {
        let o = OcrOutcome::empty();
        assert!(o.text.is_empty());
        assert_eq!(o.confidence, 0.0);
    }

    #[test]
    fn test_variant_kind_serde_lowercase() {
        let json = serde_json::to_string(&VariantKind::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }
}
