//! Stickycrop WASM - WebAssembly bindings for Stickycrop
//!
//! This crate exposes the stickycrop-core engine to a browser host that
//! drives a cropper UI.
//!
//! # Module Structure
//!
//! - `engine` - The `JsCropEngine` wrapper: view-state sync, events, queries
//! - `types` - WASM-compatible wrapper types for pixel data
//! - `logger` - Console backend for the `log` facade
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsCropEngine } from '@stickycrop/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! // The third argument is an optional partial `EngineConfig` object.
//! // Omit it (or pass `undefined`/`null`) to use the defaults.
//! const engine = new JsCropEngine(image.naturalWidth, image.naturalHeight);
//! const zoomy = new JsCropEngine(image.naturalWidth, image.naturalHeight, { max_zoom: 4 });
//! ```

use wasm_bindgen::prelude::*;

mod engine;
mod logger;
mod types;

// Re-export public types
pub use engine::JsCropEngine;
pub use types::JsPixelBuffer;

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    logger::init(log::LevelFilter::Info);
}

/// Change how much the engine logs to the console.
///
/// Accepts `error`, `warn`, `info`, `debug`, `trace` or `off`. Returns false
/// for anything else.
#[wasm_bindgen]
pub fn set_log_level(level: &str) -> bool {
    match level.parse::<log::LevelFilter>() {
        Ok(filter) => {
            logger::init(filter);
            true
        }
        Err(_) => false,
    }
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
