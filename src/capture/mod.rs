//! Image Input/Output Layer
//!
//! Decodes result screenshots into [`RawImage`] frames and renders preprocessed
//! bitmaps back into an encoded surface the OCR engine can consume.

pub mod frame;

pub use frame::RawImage;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Encoded image handed to the OCR engine
#[derive(Debug, Clone)]
pub struct OcrSurface {
    /// PNG-encoded pixel data
    pub png: Vec<u8>,
    /// Surface width in pixels
    pub width: u32,
    /// Surface height in pixels
    pub height: u32,
}

/// Load a screenshot from disk
pub fn load_image(path: &Path) -> Result<RawImage> {
    let img = image::open(path)
        .with_context(|| format!("Failed to load screenshot: {:?}", path))?;

    debug!("Loaded {:?} ({}x{})", path, img.width(), img.height());
    Ok(RawImage::from_dynamic(&img))
}

/// Decode a screenshot from an in-memory byte stream (PNG, JPEG, ...)
pub fn decode_image(bytes: &[u8]) -> Result<RawImage> {
    let img = image::load_from_memory(bytes).context("Failed to decode screenshot bytes")?;
    Ok(RawImage::from_dynamic(&img))
}

/// Render a bitmap into a PNG surface
pub fn encode_surface(image: &DynamicImage) -> Result<OcrSurface> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .context("Failed to encode OCR surface as PNG")?;

    Ok(OcrSurface {
        png,
        width: image.width(),
        height: image.height(),
    })
}
