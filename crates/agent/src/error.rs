//! Agent error types

use conduit_transform::TransformError;
use thiserror::Error;

/// Result type for agent construction
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors raised while assembling an agent
#[derive(Debug, Error)]
pub enum AgentError {
    /// The processing chain rejected its configuration
    #[error("invalid processing chain: {0}")]
    Chain(#[from] TransformError),
}
