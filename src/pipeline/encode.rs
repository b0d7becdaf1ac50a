//! Image encoding: `DynamicImage` → base64 PNG wrapped in `ImageData`.
//!
//! Vision APIs accept images as base64 payloads inside the JSON request body.
//! Postings are always re-encoded as lossless PNG. Oversized photos are first
//! scaled down to a configurable cap to stay under upload limits.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::imageops::FilterType;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode the posting image as a base64 PNG ready for the model.
///
/// If either side exceeds `max_pixels`, the image is resized to fit inside a
/// `max_pixels × max_pixels` box with its aspect ratio preserved.
pub fn encode_image(img: &DynamicImage, max_pixels: u32) -> Result<ImageData, image::ImageError> {
    let scaled;
    let img = if img.width() > max_pixels || img.height() > max_pixels {
        scaled = img.resize(max_pixels, max_pixels, FilterType::Lanczos3);
        debug!(
            "Downscaled image {}x{} → {}x{}",
            img.width(),
            img.height(),
            scaled.width(),
            scaled.height()
        );
        &scaled
    } else {
        img
    };

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
