//! Engine configuration.
//!
//! Every field has a serde default, so hosts may pass a partial object and
//! only override what they need.

use serde::{Deserialize, Serialize};

use crate::error::{CropError, CropResult};

/// Tunable thresholds for visibility classification and guards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Projected width/height below this (viewport units) counts as not visible.
    pub min_display_size: f64,
    /// Effective regions larger than this multiple of the natural image size
    /// are rejected as runaway accumulation.
    pub max_region_factor: f64,
    /// Slack allowed when testing edges against the viewport bounds.
    pub edge_tolerance: f64,
    /// Read-back differences above this mean the renderer constrained the box.
    pub constraint_tolerance: f64,
    /// Smallest zoom ratio the host may apply.
    pub min_zoom: f64,
    /// Largest zoom ratio the host may apply.
    pub max_zoom: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_display_size: 10.0,
            max_region_factor: 4.0,
            edge_tolerance: 1e-6,
            constraint_tolerance: 0.1,
            min_zoom: 0.1,
            max_zoom: 3.0,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that every threshold is usable.
    pub fn validate(&self) -> CropResult<()> {
        let positive = [
            ("max_region_factor", self.max_region_factor),
            ("min_zoom", self.min_zoom),
            ("max_zoom", self.max_zoom),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(CropError::InvalidConfig(format!(
                    "{} must be positive and finite, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("min_display_size", self.min_display_size),
            ("edge_tolerance", self.edge_tolerance),
            ("constraint_tolerance", self.constraint_tolerance),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(CropError::InvalidConfig(format!(
                    "{} must be non-negative and finite, got {}",
                    name, value
                )));
            }
        }

        if self.min_zoom > self.max_zoom {
            return Err(CropError::InvalidConfig(format!(
                "min_zoom ({}) exceeds max_zoom ({})",
                self.min_zoom, self.max_zoom
            )));
        }

        Ok(())
    }

    /// Whether a zoom ratio lies inside the allowed range.
    pub fn allows_zoom(&self, ratio: f64) -> bool {
        ratio.is_finite() && ratio >= self.min_zoom && ratio <= self.max_zoom
    }
}
