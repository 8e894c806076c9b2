//! Timeline error types

use std::time::Duration;

use thiserror::Error;

/// Errors a caller can recover from.
///
/// Caller bugs (negative loop bounds, an invalid timestamp handed to a
/// state setter) are not represented here; those panic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    /// Sample rate must be finite and positive
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    /// The message ring needs room for at least one snapshot
    #[error("Message channel capacity must be non-zero")]
    ZeroCapacity,

    /// No render call arrived while waiting to start
    #[error("No render call observed within {0:?}")]
    RenderNotStarted(Duration),
}

/// Result type for timeline operations
pub type Result<T> = std::result::Result<T, TimelineError>;
