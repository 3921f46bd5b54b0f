//! Protocol error types
//!
//! Errors that can occur when framing envelopes or parsing drain targets.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame body could not be encoded
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),

    /// Frame body is not a valid envelope batch
    #[error("failed to decode frame: {0}")]
    Decode(#[source] serde_json::Error),

    /// Frame exceeds the configured maximum size
    #[error("frame size {size} exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    /// Drain URL could not be parsed
    #[error("invalid drain url '{url}': {reason}")]
    InvalidDrainUrl { url: String, reason: &'static str },
}

impl ProtocolError {
    /// Create a frame too large error
    #[inline]
    pub fn frame_too_large(size: usize, max: usize) -> Self {
        Self::FrameTooLarge { size, max }
    }

    /// Create an invalid drain url error
    #[inline]
    pub fn invalid_drain_url(url: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidDrainUrl {
            url: url.into(),
            reason,
        }
    }
}
