//! Stickycrop Core - crop region engine
//!
//! This crate keeps a rectangular crop selection anchored to the correct
//! image pixels while the image is panned and zoomed inside a viewport.
//! The selection lives in image-space; what is shown on screen is derived
//! from it through the current transform, clipped to the viewport.
//!
//! # Modules
//!
//! - `geometry` - Rectangles, transforms and deltas for both coordinate spaces
//! - `projector` - Image-space ⇄ viewport-space mapping
//! - `visibility` - Visibility classification and display clipping
//! - `region` - Logical region, pending delta and snapshot storage
//! - `schedule` - Epoch-tagged deferred work
//! - `adapter` - Renderer interface and input events
//! - `engine` - The reconciler state machine
//! - `pixels` - RGB buffers and image-space cropping for snapshots

pub mod adapter;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod pixels;
pub mod projector;
pub mod region;
pub mod schedule;
pub mod visibility;

pub use adapter::{CropEvent, CropRenderer, EditAction, Handle, ViewRenderer};
pub use config::EngineConfig;
pub use engine::{CropData, CropEngine, EngineStats, ReconcilerState};
pub use error::{CropError, CropResult};
pub use geometry::{ImageRect, ImageSize, PendingDelta, Transform, ViewportBounds, ViewportRect};
pub use pixels::PixelBuffer;
pub use visibility::{DisplayRect, OffscreenEdge, VisibilityState};
