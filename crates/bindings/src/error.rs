//! Binding fetch errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for binding fetches
pub type Result<T> = std::result::Result<T, BindingError>;

/// Errors returned by a [`BindingFetcher`](crate::BindingFetcher)
#[derive(Debug, Error)]
pub enum BindingError {
    /// Failed to read a file or directory
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// File contents are not valid TOML for the expected shape
    #[error("failed to parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A parsed entry is not usable
    #[error("invalid binding in '{}': {message}", path.display())]
    Invalid { path: PathBuf, message: String },
}

impl BindingError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            message: message.into(),
        }
    }
}
