//! Authoritative crop region storage.
//!
//! The store holds the logical region (image-space), at most one pending
//! delta, and the snapshot captured for the current logical value. Every
//! change to the logical region drops the snapshot.

use crate::error::{CropError, CropResult};
use crate::geometry::{ImageRect, ImageSize, PendingDelta};
use crate::pixels::PixelBuffer;

/// Snapshot tied to the logical region it was rendered from.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub region: ImageRect,
    pub pixels: PixelBuffer,
}

/// Owner of the logical region, pending delta and snapshot.
#[derive(Debug, Clone, Default)]
pub struct RegionStore {
    logical: Option<ImageRect>,
    pending: Option<PendingDelta>,
    snapshot: Option<Snapshot>,
}

impl RegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logical(&self) -> Option<ImageRect> {
        self.logical
    }

    pub fn pending(&self) -> Option<PendingDelta> {
        self.pending
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Logical region plus the pending delta, if any.
    pub fn effective(&self) -> Option<ImageRect> {
        let logical = self.logical?;
        Some(match &self.pending {
            Some(delta) => logical.offset_by(delta),
            None => logical,
        })
    }

    /// Replace the logical region, drop the pending delta and the snapshot.
    pub fn commit(&mut self, region: ImageRect) {
        self.logical = Some(region);
        self.pending = None;
        self.snapshot = None;
    }

    /// Fold a delta into the pending accumulator.
    ///
    /// # Errors
    ///
    /// `NoActiveRegion` if there is no logical region to defer against.
    pub fn accumulate(&mut self, delta: PendingDelta) -> CropResult<PendingDelta> {
        if self.logical.is_none() {
            return Err(CropError::NoActiveRegion);
        }
        let next = match &self.pending {
            Some(existing) => existing.accumulate(&delta),
            None => delta,
        };
        self.pending = Some(next);
        Ok(next)
    }

    /// Store a snapshot, only if it matches the current logical region.
    pub fn store_snapshot(&mut self, snapshot: Snapshot) -> bool {
        if self.logical == Some(snapshot.region) {
            self.snapshot = Some(snapshot);
            true
        } else {
            false
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// Drop the region, delta and snapshot together.
    pub fn clear(&mut self) {
        self.logical = None;
        self.pending = None;
        self.snapshot = None;
    }
}

/// Check that a rectangle is usable as a logical region for an image.
///
/// Rejects non-finite values, non-positive sizes, and sizes beyond
/// `max_factor` times the natural image size.
pub fn validate_region(rect: &ImageRect, image: ImageSize, max_factor: f64) -> CropResult<()> {
    if !rect.is_finite() {
        return Err(CropError::DegenerateRegion(format!(
            "non-finite rectangle {:?}",
            rect
        )));
    }
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return Err(CropError::DegenerateRegion(format!(
            "non-positive size {}x{}",
            rect.width, rect.height
        )));
    }

    let max_w = image.width.max(1) as f64 * max_factor;
    let max_h = image.height.max(1) as f64 * max_factor;
    if rect.width > max_w || rect.height > max_h {
        return Err(CropError::DegenerateRegion(format!(
            "size {}x{} exceeds limit {}x{}",
            rect.width, rect.height, max_w, max_h
        )));
    }

    Ok(())
}
