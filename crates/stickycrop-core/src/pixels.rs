//! RGB pixel buffers and image-space cropping.
//!
//! Snapshots and results are plain RGB buffers. Cropping takes an image-space
//! rectangle in natural pixel units, so the output is independent of the
//! current pan/zoom.

use crate::geometry::ImageRect;

/// An RGB image buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGB pixel data in row-major order (3 bytes per pixel).
    /// Length should be width * height * 3.
    pub pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Create a new PixelBuffer with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            (width * height * 3) as usize,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a PixelBuffer from an image::RgbImage.
    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let pixels = img.into_raw();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Convert to an image::RgbImage for further processing.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
    }
}

/// Crop an image-space rectangle out of a pixel buffer.
///
/// # Behavior
///
/// - Coordinates are rounded to whole pixels
/// - The region is clamped to the image bounds
/// - Returns `None` when nothing of the region lies inside the image
pub fn crop_region(image: &PixelBuffer, region: &ImageRect) -> Option<PixelBuffer> {
    if !region.is_finite() || region.width <= 0.0 || region.height <= 0.0 {
        return None;
    }

    let src_w = image.width as f64;
    let src_h = image.height as f64;

    let left = region.x.round().clamp(0.0, src_w);
    let top = region.y.round().clamp(0.0, src_h);
    let right = region.right().round().clamp(0.0, src_w);
    let bottom = region.bottom().round().clamp(0.0, src_h);

    if right <= left || bottom <= top {
        return None;
    }

    let rgb = image.to_rgb_image()?;
    let cropped = image::imageops::crop_imm(
        &rgb,
        left as u32,
        top as u32,
        (right - left) as u32,
        (bottom - top) as u32,
    )
    .to_image();

    Some(PixelBuffer::from_rgb_image(cropped))
}


// ============================================================================
// Property-Based Tests
// ============================================================================
