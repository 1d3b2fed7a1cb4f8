//! Image codec: decode, downscale, re-encode.
//!
//! Pure transformation with no network or disk access. Every variant is
//! encoded as WebP regardless of input format, normalizing storage and
//! bandwidth cost. Aspect ratio is preserved and images are never upscaled.

use std::io::Cursor;

use image::imageops::FilterType;
use image::ExtendedColorType;

use pinnote_core::{Error, ImageVariant, Result};

/// Resize-and-reencode capability.
///
/// `quality` is in (0.0, 1.0]; encoders without lossy output (the default
/// WebP encoder here is lossless) carry it in the API for implementations
/// that support it.
pub trait ImageCodec: Send + Sync {
    /// Produce one encoded variant no wider than `max_width`, preserving
    /// aspect ratio. Deterministic for identical input and parameters.
    fn resize(&self, input: &[u8], max_width: u32, quality: f32) -> Result<ImageVariant>;
}

/// Default codec: `image`-crate decode, Lanczos3 downscale, lossless WebP
/// encode.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebpCodec;

impl WebpCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ImageCodec for WebpCodec {
    fn resize(&self, input: &[u8], max_width: u32, _quality: f32) -> Result<ImageVariant> {
        let decoded = image::load_from_memory(input)
            .map_err(|e| Error::Decode(format!("failed to decode image: {}", e)))?;

        // Downscale only: a source narrower than the cap passes through at
        // its native size.
        let resized = if decoded.width() > max_width {
            let scale = max_width as f64 / decoded.width() as f64;
            let height = ((decoded.height() as f64 * scale).round() as u32).max(1);
            decoded.resize_exact(max_width, height, FilterType::Lanczos3)
        } else {
            decoded
        };

        let (width, height) = (resized.width(), resized.height());
        let rgba = resized.to_rgba8();
        let mut bytes = Vec::new();
        let mut cursor = Cursor::new(&mut bytes);
        let encoder = image::codecs::webp::WebPEncoder::new_lossless(&mut cursor);
        encoder
            .encode(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
            .map_err(|e| Error::Encode(format!("failed to encode WebP: {}", e)))?;

        Ok(ImageVariant::new(bytes, width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinnote_core::defaults;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 40, 200]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_downscales_wide_image() {
        let codec = WebpCodec::new();
        let variant = codec.resize(&png(1600, 800), 800, 0.85).unwrap();
        assert_eq!(variant.width, 800);
        assert_eq!(variant.height, 400);
        assert_eq!(variant.byte_size, variant.bytes.len());
    }

    #[test]
    fn test_never_upscales() {
        let codec = WebpCodec::new();
        let variant = codec.resize(&png(200, 100), 800, 0.85).unwrap();
        assert_eq!(variant.width, 200);
        assert_eq!(variant.height, 100);
    }

    #[test]
    fn test_aspect_ratio_preserved() {
        let codec = WebpCodec::new();
        let variant = codec.resize(&png(900, 300), 300, 0.8).unwrap();
        assert_eq!(variant.width, 300);
        assert_eq!(variant.height, 100);
    }

    #[test]
    fn test_output_is_webp() {
        let codec = WebpCodec::new();
        let variant = codec
            .resize(&png(64, 64), defaults::MAX_THUMB_WIDTH, 0.8)
            .unwrap();
        // RIFF....WEBP container magic.
        assert_eq!(&variant.bytes[0..4], b"RIFF");
        assert_eq!(&variant.bytes[8..12], b"WEBP");
    }

    #[test]
    fn test_undecodable_input_is_decode_error() {
        let codec = WebpCodec::new();
        let err = codec.resize(b"definitely not an image", 800, 0.85).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_deterministic_for_same_input() {
        let codec = WebpCodec::new();
        let input = png(500, 500);
        let a = codec.resize(&input, 300, 0.8).unwrap();
        let b = codec.resize(&input, 300, 0.8).unwrap();
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn test_tiny_height_clamped_to_one() {
        let codec = WebpCodec::new();
        // Extreme aspect ratio: 2000x1 scaled to 300 wide would round to 0.
        let variant = codec.resize(&png(2000, 1), 300, 0.8).unwrap();
        assert_eq!(variant.width, 300);
        assert_eq!(variant.height, 1);
    }
}
