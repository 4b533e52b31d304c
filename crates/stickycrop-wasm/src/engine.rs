//! Crop engine WASM bindings.
//!
//! The browser host owns the cropper UI. Before forwarding an event it
//! mirrors the cropper's current view state (transform, container size,
//! displayed crop box) into the engine; after the event it reads back
//! `displayed_selection()` and applies it to the cropper.
//!
//! # Example (TypeScript)
//!
//! ```typescript
//! // The config object is optional; missing fields use the defaults.
//! const engine = new JsCropEngine(1000, 800, { max_zoom: 4 });
//! engine.set_viewport_bounds(500, 400);
//! engine.set_transform(canvas.left, canvas.top, canvas.width / 1000, canvas.height / 800);
//! engine.set_displayed_selection(box.left, box.top, box.width, box.height);
//! engine.ready();
//!
//! cropper.on('zoom', () => {
//!   queueMicrotask(() => {
//!     syncView(engine);
//!     engine.transform_changed();
//!     applyBox(engine.displayed_selection());
//!   });
//! });
//! ```

use stickycrop_core::{
    CropEngine, EditAction, EngineConfig, ImageSize, PixelBuffer, Transform, ViewRenderer,
    ViewportBounds, ViewportRect,
};
use wasm_bindgen::prelude::*;

use crate::types::{visibility_name, JsPixelBuffer};

/// JavaScript-accessible crop engine.
#[wasm_bindgen]
pub struct JsCropEngine {
    inner: CropEngine<ViewRenderer>,
}

#[wasm_bindgen]
impl JsCropEngine {
    /// Create an engine for an image of the given natural size.
    ///
    /// # Arguments
    /// * `image_width`, `image_height` - Natural image size in pixels
    /// * `config` - Optional partial `EngineConfig` object. `undefined` or
    ///   `null` selects the defaults; missing fields use defaults
    ///
    /// # Errors
    /// Returns error if the config cannot be deserialized or fails validation
    #[wasm_bindgen(constructor)]
    pub fn new(image_width: u32, image_height: u32, config: JsValue) -> Result<JsCropEngine, JsValue> {
        let config: EngineConfig = if config.is_undefined() || config.is_null() {
            EngineConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)
                .map_err(|e| JsValue::from_str(&format!("Invalid engine config: {}", e)))?
        };

        Self::with_config(image_width, image_height, config)
            .map_err(|e| JsValue::from_str(&e))
    }

    // ------------------------------------------------------------------
    // View state mirrored from the cropper
    // ------------------------------------------------------------------

    /// Current image-to-viewport transform.
    pub fn set_transform(&mut self, offset_x: f64, offset_y: f64, scale_x: f64, scale_y: f64) {
        self.inner.renderer_mut().transform = Transform::new(offset_x, offset_y, scale_x, scale_y);
    }

    /// Current container size.
    pub fn set_viewport_bounds(&mut self, width: f64, height: f64) {
        self.inner.renderer_mut().bounds = ViewportBounds::new(width, height);
    }

    /// Crop box as the cropper currently shows it.
    pub fn set_displayed_selection(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.inner.renderer_mut().displayed = Some(ViewportRect::new(x, y, width, height));
    }

    /// Source pixels used for snapshots (RGB, row-major).
    pub fn set_source_image(&mut self, width: u32, height: u32, pixels: Vec<u8>) -> Result<(), JsValue> {
        let expected = (width as usize) * (height as usize) * 3;
        if pixels.len() != expected {
            return Err(JsValue::from_str(&format!(
                "Pixel buffer size mismatch: expected {}, got {}",
                expected,
                pixels.len()
            )));
        }
        self.inner
            .renderer_mut()
            .set_source(PixelBuffer::new(width, height, pixels));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    pub fn ready(&mut self) {
        self.inner.on_ready();
    }

    /// Start an edit gesture. Returns false for an unknown action string.
    pub fn edit_start(&mut self, action: &str) -> bool {
        match action.parse::<EditAction>() {
            Ok(action) => {
                self.inner.on_edit_start(action);
                true
            }
            Err(e) => {
                log::warn!("{}", e);
                false
            }
        }
    }

    pub fn edit_move(&mut self) {
        self.inner.on_edit_move();
    }

    pub fn edit_end(&mut self) {
        self.inner.on_edit_end();
    }

    pub fn transform_changed(&mut self) {
        self.inner.on_transform_changed();
    }

    pub fn pan_start(&mut self) {
        self.inner.on_pan_start();
    }

    pub fn pan_move(&mut self) {
        self.inner.on_pan_move();
    }

    pub fn pan_end(&mut self) {
        self.inner.on_pan_end();
    }

    /// Whether the cropper may zoom to `ratio`. Cancel the zoom event on false.
    pub fn zoom(&mut self, ratio: f64) -> bool {
        self.inner.on_zoom(ratio)
    }

    /// Run deferred work. Call from a microtask after the cropper re-renders.
    pub fn settle(&mut self) {
        self.inner.settle();
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// The cropper loaded a new image of the given natural size.
    pub fn replace_image(&mut self, image_width: u32, image_height: u32) {
        let renderer = self.inner.renderer_mut();
        renderer.image_size = ImageSize::new(image_width, image_height);
        renderer.source = None;
        self.inner.replace_image();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Selection the cropper should display, as `[x, y, width, height]`.
    pub fn displayed_selection(&self) -> Option<Vec<f64>> {
        self.inner
            .renderer()
            .displayed
            .map(|r| vec![r.x, r.y, r.width, r.height])
    }

    /// Logical region in image pixels, as `[x, y, width, height]`.
    pub fn logical_region(&self) -> Option<Vec<f64>> {
        self.inner
            .logical_region()
            .map(|r| vec![r.x, r.y, r.width, r.height])
    }

    /// Logical region plus pending flag, as a plain object.
    pub fn crop_data(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.crop_data())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Engine counters, as a plain object.
    pub fn stats(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.stats())
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// One of `fully-visible`, `partially-visible`, `out-of-bounds`.
    pub fn visibility(&self) -> String {
        visibility_name(self.inner.visibility_state()).to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn has_deferred_update(&self) -> bool {
        self.inner.has_deferred_update()
    }

    /// Cropped pixels, preferring the snapshot taken at the last commit.
    pub fn result(&mut self) -> Option<JsPixelBuffer> {
        self.inner.result().map(JsPixelBuffer::from_buffer)
    }
}

impl JsCropEngine {
    /// Build an engine from an already-parsed config.
    pub(crate) fn with_config(
        image_width: u32,
        image_height: u32,
        config: EngineConfig,
    ) -> Result<JsCropEngine, String> {
        let renderer = ViewRenderer::new(
            ImageSize::new(image_width, image_height),
            ViewportBounds::default(),
            Transform::identity(),
        );
        let inner = CropEngine::with_config(renderer, config).map_err(|e| e.to_string())?;
        Ok(JsCropEngine { inner })
    }
}
