//! Geometry primitives for the two coordinate spaces.
//!
//! # Coordinate Spaces
//!
//! - **Image-space**: natural, untransformed pixel grid of the source image.
//! - **Viewport-space**: on-screen container units, after pan/zoom.
//!
//! `ImageRect` and `ViewportRect` carry identical fields but are separate
//! types, so a rectangle can only change space through the projector.
//! Origin is the top-left corner in both spaces.

use serde::{Deserialize, Serialize};

/// A rectangle in image-space (natural pixel units of the source image).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ImageRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (`x + width`).
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge (`y + height`).
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Apply a pending delta component-wise.
    pub fn offset_by(&self, delta: &PendingDelta) -> Self {
        Self {
            x: self.x + delta.dx,
            y: self.y + delta.dy,
            width: self.width + delta.dwidth,
            height: self.height + delta.dheight,
        }
    }

    /// Component-wise difference `self - baseline`.
    pub fn delta_from(&self, baseline: &ImageRect) -> PendingDelta {
        PendingDelta {
            dx: self.x - baseline.x,
            dy: self.y - baseline.y,
            dwidth: self.width - baseline.width,
            dheight: self.height - baseline.height,
        }
    }

    /// True if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Check whether two rectangles match within `tolerance` per component.
    pub fn approx_eq(&self, other: &ImageRect, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}

/// A rectangle in viewport-space (on-screen container units).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewportRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewportRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// True for a zero-size rectangle (the off-screen indicator).
    pub fn is_point(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }

    /// Largest per-component difference between two rectangles.
    pub fn max_difference(&self, other: &ViewportRect) -> f64 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.width - other.width).abs())
            .max((self.height - other.height).abs())
    }

    pub fn approx_eq(&self, other: &ViewportRect, tolerance: f64) -> bool {
        self.max_difference(other) <= tolerance
    }
}

/// Image-to-viewport affine transform: `viewport = offset + image * scale`.
///
/// Recomputed by the renderer on every pan/zoom; read-only to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn new(offset_x: f64, offset_y: f64, scale_x: f64, scale_y: f64) -> Self {
        Self {
            offset_x,
            offset_y,
            scale_x,
            scale_y,
        }
    }

    /// No offset, unit scale.
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    /// A transform is invertible when both scales are non-zero and every
    /// component is finite.
    pub fn is_invertible(&self) -> bool {
        self.offset_x.is_finite()
            && self.offset_y.is_finite()
            && self.scale_x.is_finite()
            && self.scale_y.is_finite()
            && self.scale_x != 0.0
            && self.scale_y != 0.0
    }
}

/// Size of the visible container in viewport-space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub width: f64,
    pub height: f64,
}

impl ViewportBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Natural pixel dimensions of the source image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// An uncommitted image-space adjustment to the logical region.
///
/// Accumulates by summation across consecutive deferred edits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingDelta {
    pub dx: f64,
    pub dy: f64,
    pub dwidth: f64,
    pub dheight: f64,
}

impl PendingDelta {
    pub fn new(dx: f64, dy: f64, dwidth: f64, dheight: f64) -> Self {
        Self {
            dx,
            dy,
            dwidth,
            dheight,
        }
    }

    /// Component-wise sum.
    pub fn accumulate(&self, other: &PendingDelta) -> Self {
        Self {
            dx: self.dx + other.dx,
            dy: self.dy + other.dy,
            dwidth: self.dwidth + other.dwidth,
            dheight: self.dheight + other.dheight,
        }
    }
}
