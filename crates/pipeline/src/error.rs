//! Pipeline error types
//!
//! Errors raised while connecting to or delivering to a downstream consumer.

use std::time::Duration;

use conduit_protocol::ProtocolError;
use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Drain URL could not be parsed
    #[error("invalid drain: {0}")]
    InvalidDrain(#[from] ProtocolError),

    /// No connector registered for the drain URL scheme
    #[error("unsupported drain scheme '{0}'")]
    UnsupportedScheme(String),

    /// Downstream could not be reached
    #[error("connect to {target} failed: {message}")]
    Connect { target: String, message: String },

    /// Downstream rejected or dropped a write
    #[error("send to {target} failed: {message}")]
    Send { target: String, message: String },

    /// Downstream did not accept a write in time
    #[error("send timed out after {0:?}")]
    SendTimeout(Duration),
}

impl PipelineError {
    /// Create a connect error
    pub fn connect(target: impl Into<String>, message: impl ToString) -> Self {
        Self::Connect {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Create a send error
    pub fn send(target: impl Into<String>, message: impl ToString) -> Self {
        Self::Send {
            target: target.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
