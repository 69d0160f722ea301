//! Frame data structures for captured result screens

use image::{DynamicImage, RgbaImage};

/// A captured result screen, as handed over by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl RawImage {
    /// Create a new frame from RGBA data
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self { data, width, height }
    }

    /// Create a frame from any decoded image
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::new(rgba.into_raw(), width, height)
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether the frame has no visible pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// View the pixel buffer as an RGBA image.
    ///
    /// Returns `None` when the buffer length does not match `width * height * 4`.
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_from_dynamic_keeps_dimensions() {
        let img = RgbaImage::from_pixel(7, 3, Rgba([10, 20, 30, 255]));
        let frame = RawImage::from_dynamic(&DynamicImage::ImageRgba8(img));

        assert_eq!(frame.dimensions(), (7, 3));
        assert_eq!(frame.data.len(), 7 * 3 * 4);
        assert_eq!(&frame.data[0..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_to_rgba_image_rejects_short_buffer() {
        let frame = RawImage::new(vec![0; 10], 2, 2);
        assert!(frame.to_rgba_image().is_none());
    }

    #[test]
    fn test_frames_compare_by_pixels_only() {
        let a = RawImage::new(vec![1, 2, 3, 4], 1, 1);
        let b = RawImage::new(vec![1, 2, 3, 4], 1, 1);
        assert_eq!(a, b);
        assert_ne!(a, RawImage::new(vec![1, 2, 3, 5], 1, 1));
    }

    #[test]
    fn test_is_empty() {
        assert!(RawImage::new(Vec::new(), 0, 5).is_empty());
        assert!(!RawImage::new(vec![0; 4], 1, 1).is_empty());
    }
}
