//! Mapping between image-space and viewport-space.
//!
//! The forward mapping is `viewport = offset + image * scale` per axis.
//! These are pure functions with no hidden state.

use crate::error::{CropError, CropResult};
use crate::geometry::{ImageRect, Transform, ViewportRect};

/// Project an image-space rectangle into viewport-space.
///
/// # Example
///
/// ```ignore
/// let t = Transform::new(0.0, 0.0, 0.5, 0.5);
/// let v = to_viewport(&ImageRect::new(100.0, 100.0, 200.0, 150.0), &t);
/// assert_eq!(v, ViewportRect::new(50.0, 50.0, 100.0, 75.0));
/// ```
pub fn to_viewport(rect: &ImageRect, transform: &Transform) -> ViewportRect {
    ViewportRect {
        x: transform.offset_x + rect.x * transform.scale_x,
        y: transform.offset_y + rect.y * transform.scale_y,
        width: rect.width * transform.scale_x,
        height: rect.height * transform.scale_y,
    }
}

/// Map a viewport-space rectangle back into image-space.
///
/// # Errors
///
/// Returns `CropError::InvalidTransform` when either scale is zero or any
/// transform component is non-finite.
pub fn to_image(rect: &ViewportRect, transform: &Transform) -> CropResult<ImageRect> {
    if !transform.is_invertible() {
        return Err(CropError::InvalidTransform);
    }

    Ok(ImageRect {
        x: (rect.x - transform.offset_x) / transform.scale_x,
        y: (rect.y - transform.offset_y) / transform.scale_y,
        width: rect.width / transform.scale_x,
        height: rect.height / transform.scale_y,
    })
}


// ============================================================================
// Property-Based Tests
// ============================================================================
