//! WASM-compatible wrapper types for pixel data.
//!
//! This module provides JavaScript-friendly types that wrap the core Stickycrop types,
//! handling the conversion between Rust and JavaScript data representations.

use stickycrop_core::{PixelBuffer, VisibilityState};
use wasm_bindgen::prelude::*;

/// An RGB pixel buffer wrapper for JavaScript.
///
/// Holds crop results handed back to the host. The pixel data is stored in
/// WASM memory; `pixels()` copies it out as a `Uint8Array`.
#[wasm_bindgen]
pub struct JsPixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[wasm_bindgen]
impl JsPixelBuffer {
    /// Get the image width in pixels
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the image height in pixels
    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get the number of bytes in the pixel buffer (width * height * 3 for RGB)
    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.pixels.len()
    }

    /// Returns RGB pixel data as Uint8Array.
    ///
    /// Note: This creates a copy of the pixel data.
    pub fn pixels(&self) -> Vec<u8> {
        self.pixels.clone()
    }
}

impl JsPixelBuffer {
    pub(crate) fn from_buffer(buffer: PixelBuffer) -> Self {
        Self {
            width: buffer.width,
            height: buffer.height,
            pixels: buffer.pixels,
        }
    }
}

/// Convert a visibility state to the string handed to JavaScript.
pub(crate) fn visibility_name(state: VisibilityState) -> &'static str {
    match state {
        VisibilityState::FullyVisible => "fully-visible",
        VisibilityState::PartiallyVisible => "partially-visible",
        VisibilityState::OutOfBounds => "out-of-bounds",
    }
}
