//! Image preprocessing filters for OCR optimization
//!
//! Turns a result screenshot into a clean binary bitmap: grayscale, a light
//! Gaussian blur against compression noise, a locally adaptive threshold (HUD
//! overlays have uneven brightness) and a final histogram equalization.
//!
//! Preprocessing never fails the pipeline. When the image operations are not
//! ready or the input cannot be processed, the original frame is passed through
//! and the reason is logged.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use imageproc::stats::cumulative_histogram;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::capture::RawImage;
use crate::config::PreprocessingSettings;

/// Why preprocessing fell back to the original image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreprocessingDegraded {
    #[error("image operations are not ready yet")]
    NotReady,
    #[error("image has no visible pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferMismatch { expected: usize, actual: usize },
}

/// One-shot readiness handle for the image operations.
///
/// Cloned handles all observe the same trigger.
#[derive(Debug, Clone)]
pub struct ImageOpsReadiness {
    rx: watch::Receiver<bool>,
}

/// Fires an [`ImageOpsReadiness`] exactly once
#[derive(Debug)]
pub struct ReadinessTrigger {
    tx: watch::Sender<bool>,
}

impl ImageOpsReadiness {
    /// Create an unfired handle together with its trigger
    pub fn pending() -> (ReadinessTrigger, Self) {
        let (tx, rx) = watch::channel(false);
        (ReadinessTrigger { tx }, Self { rx })
    }

    /// Create a handle that is already fired
    pub fn ready() -> Self {
        let (trigger, readiness) = Self::pending();
        trigger.fire();
        readiness
    }

    /// Non-blocking check
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the trigger fires.
    ///
    /// Returns `false` if the trigger was dropped without firing.
    pub async fn wait(&self) -> bool {
        let mut rx = self.rx.clone();
        let ready = rx.wait_for(|ready| *ready).await.is_ok();
        ready
    }
}

impl ReadinessTrigger {
    pub fn fire(self) {
        self.tx.send_replace(true);
    }
}

/// Output of the preprocessing stage
#[derive(Debug, Clone)]
pub enum PreprocessedImage {
    /// Cleaned single-channel bitmap
    Binarized(GrayImage),
    /// The untouched input, with the degradation reason if any
    Passthrough {
        original: RawImage,
        reason: Option<PreprocessingDegraded>,
    },
}

impl PreprocessedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            PreprocessedImage::Binarized(gray) => gray.dimensions(),
            PreprocessedImage::Passthrough { original, .. } => original.dimensions(),
        }
    }

    /// Whether preprocessing fell back because of a problem
    pub fn is_degraded(&self) -> bool {
        matches!(self, PreprocessedImage::Passthrough { reason: Some(_), .. })
    }

    /// Convert to a renderable image.
    ///
    /// `None` only for a passthrough frame whose buffer does not match its size.
    pub fn to_dynamic(&self) -> Option<DynamicImage> {
        match self {
            PreprocessedImage::Binarized(gray) => Some(DynamicImage::ImageLuma8(gray.clone())),
            PreprocessedImage::Passthrough { original, .. } => {
                original.to_rgba_image().map(DynamicImage::ImageRgba8)
            }
        }
    }
}

/// Grayscale → blur → adaptive threshold → equalize
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    settings: PreprocessingSettings,
    readiness: ImageOpsReadiness,
}

impl ImagePreprocessor {
    pub fn new(settings: PreprocessingSettings, readiness: ImageOpsReadiness) -> Self {
        Self { settings, readiness }
    }

    /// Preprocess a frame, falling back to the original on any problem
    pub fn preprocess(&self, image: RawImage) -> PreprocessedImage {
        if !self.settings.enabled {
            debug!("OCR preprocessing disabled");
            return PreprocessedImage::Passthrough {
                original: image,
                reason: None,
            };
        }

        if let Err(reason) = self.check(&image) {
            warn!("Preprocessing degraded, using original image: {}", reason);
            return PreprocessedImage::Passthrough {
                original: image,
                reason: Some(reason),
            };
        }

        let (width, height) = image.dimensions();
        let gray = to_grayscale(image);
        let blurred = blur(&gray, self.settings.blur_sigma);
        let binary = adaptive_threshold(&blurred, self.settings.block_size, self.settings.bias);
        let equalized = equalize(&binary);

        debug!(
            "Preprocessed {}x{} frame (sigma={}, block={}, bias={})",
            width, height, self.settings.blur_sigma, self.settings.block_size, self.settings.bias
        );

        PreprocessedImage::Binarized(equalized)
    }

    fn check(&self, image: &RawImage) -> Result<(), PreprocessingDegraded> {
        if !self.readiness.is_ready() {
            return Err(PreprocessingDegraded::NotReady);
        }

        if image.is_empty() {
            return Err(PreprocessingDegraded::EmptyImage {
                width: image.width,
                height: image.height,
            });
        }

        let expected = image.width as usize * image.height as usize * 4;
        if image.data.len() != expected {
            return Err(PreprocessingDegraded::BufferMismatch {
                expected,
                actual: image.data.len(),
            });
        }

        Ok(())
    }
}

/// Luma conversion with the standard ITU-R 601 weights
fn to_grayscale(image: RawImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let data = image.data;

    GrayImage::from_fn(width, height, |x, y| {
        let idx = (y as usize * width as usize + x as usize) * 4;
        let luma = 0.299 * data[idx] as f32 + 0.587 * data[idx + 1] as f32 + 0.114 * data[idx + 2] as f32;
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

fn blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma > 0.0 {
        gaussian_blur_f32(image, sigma)
    } else {
        image.clone()
    }
}

/// Gaussian sigma matching a square window of `block_size` pixels
fn block_sigma(block_size: u32) -> f32 {
    0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Gaussian-weighted local threshold: white when the pixel is brighter than
/// its neighborhood mean minus `bias`.
fn adaptive_threshold(image: &GrayImage, block_size: u32, bias: i16) -> GrayImage {
    // Neighborhoods need a center pixel
    let block_size = block_size.max(3) | 1;
    let local_mean = gaussian_blur_f32(image, block_sigma(block_size));

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let pixel = image.get_pixel(x, y)[0] as i16;
        let threshold = local_mean.get_pixel(x, y)[0] as i16 - bias;
        if pixel > threshold {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Histogram equalization anchored at both ends: the darkest present level maps
/// to 0 and the brightest to 255, so a binary image stays strictly 0/255.
/// A single-level image is returned unchanged.
fn equalize(image: &GrayImage) -> GrayImage {
    let cdf = cumulative_histogram(image).channels[0];
    let total = cdf[255] as u64;
    let cdf_min = cdf.iter().copied().find(|&count| count > 0).unwrap_or(0) as u64;

    if total == cdf_min {
        return image.clone();
    }

    let scale = 255.0 / (total - cdf_min) as f32;
    let lut: [u8; 256] = std::array::from_fn(|level| {
        let above_min = (cdf[level] as u64).saturating_sub(cdf_min);
        (above_min as f32 * scale).round().clamp(0.0, 255.0) as u8
    });

    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel[0] = lut[pixel[0] as usize];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preprocessor() -> ImagePreprocessor {
        ImagePreprocessor::new(PreprocessingSettings::default(), ImageOpsReadiness::ready())
    }

    /// White frame with a dark two-pixel vertical stroke at x = 20..22
    fn stroke_frame() -> RawImage {
        let (w, h) = (40u32, 20u32);
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for _y in 0..h {
            for x in 0..w {
                let v = if (20..22).contains(&x) { 0 } else { 255 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        RawImage::new(data, w, h)
    }

    #[test]
    fn test_grayscale_weights() {
        let gray = to_grayscale(RawImage::new(vec![255, 0, 0, 255], 1, 1));
        // 0.299 * 255 = 76.2
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
    }

    #[test]
    fn test_block_sigma_reference_values() {
        assert!((block_sigma(3) - 0.8).abs() < 1e-6);
        assert!((block_sigma(11) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_preserves_dimensions() {
        let result = preprocessor().preprocess(stroke_frame());
        assert_eq!(result.dimensions(), (40, 20));
        assert!(!result.is_degraded());
        match result.to_dynamic() {
            Some(DynamicImage::ImageLuma8(_)) => {}
            other => panic!("Expected grayscale output, got {:?}", other.map(|i| i.color())),
        }
    }

    #[test]
    fn test_stroke_stays_dark_background_white() {
        let PreprocessedImage::Binarized(gray) = preprocessor().preprocess(stroke_frame()) else {
            panic!("Expected binarized output");
        };

        assert_eq!(gray.get_pixel(20, 10)[0], 0, "stroke should be black");
        assert_eq!(gray.get_pixel(2, 10)[0], 255, "background should be white");
        assert_eq!(gray.get_pixel(38, 10)[0], 255, "background should be white");
    }

    #[test]
    fn test_preprocess_is_deterministic() {
        let a = preprocessor().preprocess(stroke_frame());
        let b = preprocessor().preprocess(stroke_frame());
        match (a, b) {
            (PreprocessedImage::Binarized(a), PreprocessedImage::Binarized(b)) => {
                assert_eq!(a.as_raw(), b.as_raw())
            }
            _ => panic!("Expected binarized output twice"),
        }
    }

    #[test]
    fn test_not_ready_passes_original_through() {
        let (_trigger, readiness) = ImageOpsReadiness::pending();
        let pre = ImagePreprocessor::new(PreprocessingSettings::default(), readiness);
        let frame = stroke_frame();
        let original = frame.data.clone();

        match pre.preprocess(frame) {
            PreprocessedImage::Passthrough { original: out, reason } => {
                assert_eq!(reason, Some(PreprocessingDegraded::NotReady));
                assert_eq!(out.data, original);
            }
            _ => panic!("Expected passthrough"),
        }
    }

    #[test]
    fn test_empty_image_degrades() {
        let result = preprocessor().preprocess(RawImage::new(Vec::new(), 0, 0));
        assert!(result.is_degraded());
        match result {
            PreprocessedImage::Passthrough { reason, .. } => {
                assert_eq!(reason, Some(PreprocessingDegraded::EmptyImage { width: 0, height: 0 }))
            }
            _ => panic!("Expected passthrough"),
        }
    }

    #[test]
    fn test_buffer_mismatch_degrades() {
        let result = preprocessor().preprocess(RawImage::new(vec![0; 12], 2, 2));
        match &result {
            PreprocessedImage::Passthrough { reason, .. } => assert_eq!(
                *reason,
                Some(PreprocessingDegraded::BufferMismatch { expected: 16, actual: 12 })
            ),
            _ => panic!("Expected passthrough"),
        }
        assert!(result.to_dynamic().is_none());
    }

    #[test]
    fn test_disabled_is_not_degraded() {
        let settings = PreprocessingSettings {
            enabled: false,
            ..Default::default()
        };
        let pre = ImagePreprocessor::new(settings, ImageOpsReadiness::ready());
        let result = pre.preprocess(stroke_frame());

        assert!(!result.is_degraded());
        assert!(matches!(result.to_dynamic(), Some(DynamicImage::ImageRgba8(_))));
    }

    #[test]
    fn test_equalize_stretches_to_full_range() {
        let two_levels = GrayImage::from_fn(4, 4, |x, _| if x < 3 { Luma([10]) } else { Luma([200]) });
        let out = equalize(&two_levels);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(3, 0)[0], 255);

        let uniform = GrayImage::from_pixel(3, 3, Luma([90]));
        assert_eq!(equalize(&uniform).as_raw(), uniform.as_raw());
    }

    #[test]
    fn test_striped_frame_output_is_pure_black_and_white() {
        let (w, h) = (24u32, 10u32);
        let mut data = Vec::with_capacity((w * h * 4) as usize);
        for _y in 0..h {
            for x in 0..w {
                let v = if x % 2 == 0 { 20 } else { 235 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }

        let PreprocessedImage::Binarized(gray) = preprocessor().preprocess(RawImage::new(data, w, h)) else {
            panic!("Expected binarized output");
        };

        let mut levels: Vec<u8> = gray.pixels().map(|p| p[0]).collect();
        levels.sort_unstable();
        levels.dedup();
        assert_eq!(levels, vec![0, 255]);
    }

    #[test]
    fn test_adaptive_threshold_is_binary() {
        let gray = GrayImage::from_fn(30, 30, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
        let binary = adaptive_threshold(&gray, 11, 2);
        assert!(binary.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[tokio::test]
    async fn test_readiness_fires_once_for_all_clones() {
        let (trigger, readiness) = ImageOpsReadiness::pending();
        let observer = readiness.clone();
        assert!(!observer.is_ready());

        let waiter = tokio::spawn(async move { observer.wait().await });
        trigger.fire();

        assert!(waiter.await.unwrap());
        assert!(readiness.is_ready());
    }

    #[tokio::test]
    async fn test_readiness_dropped_trigger() {
        let (trigger, readiness) = ImageOpsReadiness::pending();
        drop(trigger);
        assert!(!readiness.wait().await);
    }
}
