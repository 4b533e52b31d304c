//! Interface to the external rendering library.
//!
//! The engine never owns the on-screen state. It reads the current transform
//! and viewport from a [`CropRenderer`], and writes back the selection it
//! wants displayed. The renderer is expected to present one canonical
//! image-to-viewport transform; reconciling image box vs. wrapper box
//! anchoring is the renderer's job.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geometry::{ImageRect, ImageSize, Transform, ViewportBounds, ViewportRect};
use crate::pixels::{crop_region, PixelBuffer};

/// What the engine needs from the host renderer.
pub trait CropRenderer {
    /// Current image-to-viewport transform.
    fn transform(&self) -> Transform;

    /// Size of the visible container.
    fn viewport_bounds(&self) -> ViewportBounds;

    /// Natural size of the source image.
    fn image_size(&self) -> ImageSize;

    /// Selection as currently displayed, if the renderer shows one.
    fn displayed_selection(&self) -> Option<ViewportRect>;

    /// Ask the renderer to display a selection. The renderer may adjust it
    /// to its own constraints.
    fn set_displayed_selection(&mut self, rect: ViewportRect);

    /// Render the pixels under an image-space rectangle.
    fn render_pixels(&mut self, region: &ImageRect) -> Option<PixelBuffer>;
}

/// The gesture a user started on the cropper.
///
/// Names follow the usual cropper action strings: `move` drags the image,
/// `all` drags the box, `crop` draws a new box, compass points resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditAction {
    /// Drag the image (pan), not the selection.
    Move,
    /// Drag the whole selection.
    All,
    /// Draw a new selection.
    Crop,
    /// Resize from an edge or corner.
    Resize(Handle),
}

impl EditAction {
    /// True when the gesture pans the image instead of editing the selection.
    pub fn is_pan(self) -> bool {
        self == EditAction::Move
    }
}

/// Resize handle on the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handle {
    N,
    E,
    S,
    W,
    NE,
    NW,
    SE,
    SW,
}

impl FromStr for EditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s {
            "move" => EditAction::Move,
            "all" => EditAction::All,
            "crop" => EditAction::Crop,
            "n" => EditAction::Resize(Handle::N),
            "e" => EditAction::Resize(Handle::E),
            "s" => EditAction::Resize(Handle::S),
            "w" => EditAction::Resize(Handle::W),
            "ne" => EditAction::Resize(Handle::NE),
            "nw" => EditAction::Resize(Handle::NW),
            "se" => EditAction::Resize(Handle::SE),
            "sw" => EditAction::Resize(Handle::SW),
            other => return Err(format!("Unknown edit action: {}", other)),
        };
        Ok(action)
    }
}

/// Discrete input events, processed one at a time by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropEvent {
    Ready,
    EditStart(EditAction),
    EditMove,
    EditEnd,
    TransformChanged,
    PanStart,
    PanMove,
    PanEnd,
}

/// A renderer backed by plain state.
///
/// Hosts that receive view state by value (the WASM bindings, tests) mirror
/// the live renderer into this struct before each event and read
/// `displayed` back afterwards.
#[derive(Debug, Clone, Default)]
pub struct ViewRenderer {
    pub transform: Transform,
    pub bounds: ViewportBounds,
    pub image_size: ImageSize,
    pub displayed: Option<ViewportRect>,
    /// Source pixels for snapshots; `None` renders nothing.
    pub source: Option<PixelBuffer>,
    /// Number of `render_pixels` calls, for diagnostics.
    pub renders: usize,
}

impl ViewRenderer {
    pub fn new(image_size: ImageSize, bounds: ViewportBounds, transform: Transform) -> Self {
        Self {
            transform,
            bounds,
            image_size,
            ..Self::default()
        }
    }

    /// Replace the source image, updating the natural size to match.
    pub fn set_source(&mut self, source: PixelBuffer) {
        self.image_size = ImageSize::new(source.width, source.height);
        self.source = Some(source);
    }
}

impl CropRenderer for ViewRenderer {
    fn transform(&self) -> Transform {
        self.transform
    }

    fn viewport_bounds(&self) -> ViewportBounds {
        self.bounds
    }

    fn image_size(&self) -> ImageSize {
        self.image_size
    }

    fn displayed_selection(&self) -> Option<ViewportRect> {
        self.displayed
    }

    fn set_displayed_selection(&mut self, rect: ViewportRect) {
        self.displayed = Some(rect);
    }

    fn render_pixels(&mut self, region: &ImageRect) -> Option<PixelBuffer> {
        self.renders += 1;
        crop_region(self.source.as_ref()?, region)
    }
}
