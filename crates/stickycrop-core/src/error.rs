//! Error types for the crop engine.
//!
//! None of these are fatal. The engine's event handlers absorb every error,
//! keep the last good state and log the condition. They surface as `Result`s
//! only from the pure helpers (projector, region store, config validation).

use thiserror::Error;

/// Error types for crop region operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CropError {
    /// The image-to-viewport transform has a zero or non-finite component.
    #[error("Invalid transform: scale must be non-zero and finite")]
    InvalidTransform,

    /// The rectangle is non-positive or implausibly large.
    #[error("Degenerate region: {0}")]
    DegenerateRegion(String),

    /// An operation needed a region before one exists.
    #[error("No active crop region")]
    NoActiveRegion,

    /// Engine configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias used throughout the crate.
pub type CropResult<T> = Result<T, CropError>;
