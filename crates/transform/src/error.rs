//! Transform error types
//!
//! Errors that can occur while processing an envelope.

use thiserror::Error;

/// Errors that can occur during processing
#[derive(Debug, Error)]
pub enum TransformError {
    /// Processing logic failed
    #[error("{processor} failed: {message}")]
    ProcessFailed {
        processor: &'static str,
        message: String,
    },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TransformError {
    /// Create a process failed error
    pub fn failed(processor: &'static str, message: impl Into<String>) -> Self {
        Self::ProcessFailed {
            processor,
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
