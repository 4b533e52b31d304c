//! Visibility classification and display clipping.
//!
//! Classification is deliberately coarse: it answers whether an edit made
//! against the displayed rectangle can be trusted as the new baseline, not
//! how much area is on screen.
//!
//! Clipping only changes what is displayed. A clipped rectangle must never
//! be written back into the logical region.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::geometry::{ViewportBounds, ViewportRect};

/// How much of a projected selection lies inside the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VisibilityState {
    /// All four edges lie within the viewport.
    FullyVisible,
    /// Overlaps the viewport but at least one edge is outside.
    PartiallyVisible,
    /// No overlap, or too small to be meaningfully visible.
    #[default]
    OutOfBounds,
}

impl VisibilityState {
    pub fn is_fully_visible(self) -> bool {
        self == VisibilityState::FullyVisible
    }
}

/// Viewport edge nearest to an off-screen selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OffscreenEdge {
    Left,
    Right,
    Top,
    Bottom,
}

/// A rectangle ready for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayRect {
    /// Intersection with the viewport, or a zero-size indicator point.
    pub rect: ViewportRect,
    /// Set when `rect` is an indicator for a selection entirely off screen.
    pub offscreen: Option<OffscreenEdge>,
}

impl DisplayRect {
    pub fn is_indicator(&self) -> bool {
        self.offscreen.is_some()
    }
}

/// True if the rectangle reaches into the open viewport area.
fn overlaps(rect: &ViewportRect, bounds: &ViewportBounds) -> bool {
    rect.x < bounds.width && rect.right() > 0.0 && rect.y < bounds.height && rect.bottom() > 0.0
}

/// Classify a viewport-space rectangle against the viewport bounds.
pub fn classify(
    rect: &ViewportRect,
    bounds: &ViewportBounds,
    config: &EngineConfig,
) -> VisibilityState {
    if !overlaps(rect, bounds) {
        return VisibilityState::OutOfBounds;
    }

    if rect.width.abs() < config.min_display_size || rect.height.abs() < config.min_display_size {
        return VisibilityState::OutOfBounds;
    }

    let tol = config.edge_tolerance;
    let inside = rect.x >= -tol
        && rect.y >= -tol
        && rect.right() <= bounds.width + tol
        && rect.bottom() <= bounds.height + tol;

    if inside {
        VisibilityState::FullyVisible
    } else {
        VisibilityState::PartiallyVisible
    }
}

/// Clip a viewport-space rectangle to the viewport for display.
///
/// When nothing overlaps, the result is a zero-size point on the viewport
/// edge closest to the selection, so the UI can hint at its direction.
pub fn clip(rect: &ViewportRect, bounds: &ViewportBounds) -> DisplayRect {
    if overlaps(rect, bounds) {
        let left = rect.x.max(0.0);
        let top = rect.y.max(0.0);
        let right = rect.right().min(bounds.width);
        let bottom = rect.bottom().min(bounds.height);
        return DisplayRect {
            rect: ViewportRect::new(left, top, right - left, bottom - top),
            offscreen: None,
        };
    }

    let (x, horizontal) = if rect.right() <= 0.0 {
        (0.0, Some(OffscreenEdge::Left))
    } else if rect.x >= bounds.width {
        (bounds.width, Some(OffscreenEdge::Right))
    } else {
        (rect.x.clamp(0.0, bounds.width), None)
    };

    let (y, vertical) = if rect.bottom() <= 0.0 {
        (0.0, Some(OffscreenEdge::Top))
    } else if rect.y >= bounds.height {
        (bounds.height, Some(OffscreenEdge::Bottom))
    } else {
        (rect.y.clamp(0.0, bounds.height), None)
    };

    DisplayRect {
        rect: ViewportRect::new(x, y, 0.0, 0.0),
        // No overlap means at least one axis is off screen.
        offscreen: horizontal.or(vertical),
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
