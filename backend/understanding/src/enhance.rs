//! Image variants fed to the vision model.
//!
//! The original photo always comes first. A grayscale, contrast-stretched and
//! sharpened re-encoding follows when the photo can be decoded; plate paint
//! and label print often read better that way.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use flexscan_core::FlexscanError;

/// Longest edge of the enhanced variant. Bigger photos are downscaled first.
const MAX_EDGE: u32 = 2048;
const CONTRAST: f32 = 35.0;
const UNSHARP_SIGMA: f32 = 1.2;
const UNSHARP_THRESHOLD: i32 = 2;

/// One encoding of the submitted photo.
#[derive(Debug, Clone)]
pub struct ImageVariant {
    /// Short label for logs ("original", "enhanced").
    pub label: &'static str,
    pub mime_type: String,
    /// Base64 of the encoded bytes, computed once per variant.
    pub b64: String,
}

impl ImageVariant {
    fn new(label: &'static str, bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self { label, mime_type: mime_type.into(), b64: STANDARD.encode(bytes) }
    }
}

/// Build the ordered variant list. Never fails: an enhancement error only
/// drops the enhanced variant.
pub fn variants(original: &Bytes, enhance: bool) -> Vec<ImageVariant> {
    let mut out = vec![ImageVariant::new("original", original, sniff_mime(original))];

    if enhance {
        match enhanced_jpeg(original) {
            Ok(bytes) => out.push(ImageVariant::new("enhanced", &bytes, "image/jpeg")),
            Err(e) => debug!(error = %e, "Skipping enhanced image variant"),
        }
    }

    out
}

/// MIME type from magic bytes, JPEG when unknown (Telegram photos are JPEG).
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("image/jpeg")
}

/// Grayscale, stretch contrast, unsharp mask, re-encode as JPEG.
pub fn enhanced_jpeg(bytes: &[u8]) -> Result<Vec<u8>, FlexscanError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| FlexscanError::InvalidImage(e.to_string()))?;

    let img = if img.width().max(img.height()) > MAX_EDGE {
        img.resize(MAX_EDGE, MAX_EDGE, FilterType::Triangle)
    } else {
        img
    };

    let processed = img
        .grayscale()
        .adjust_contrast(CONTRAST)
        .unsharpen(UNSHARP_SIGMA, UNSHARP_THRESHOLD);

    let mut out = Vec::new();
    DynamicImage::ImageLuma8(processed.to_luma8())
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)
        .map_err(|e| FlexscanError::InvalidImage(e.to_string()))?;
    Ok(out)
}
