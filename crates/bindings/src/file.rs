//! File-backed binding fetcher
//!
//! Reads a TOML file of `[[bindings]]` tables on every fetch:
//!
//! ```toml
//! [[bindings]]
//! application_id = "app-1"
//! hostname = "host-1"
//! drain_url = "tcp://10.0.0.5:3459"
//! ```

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use conduit_protocol::Binding;
use serde::Deserialize;
use tracing::warn;

use crate::{BindingError, BindingFetcher, Result};

#[cfg(test)]
#[path = "file_test.rs"]
mod tests;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BindingsFile {
    bindings: Vec<Binding>,
}

/// Fetches bindings from a TOML file
///
/// A missing file means "no bindings". Entries whose drain URL does not parse
/// are skipped with a warning so one bad entry cannot freeze the whole set.
#[derive(Debug, Clone)]
pub struct FileBindingFetcher {
    path: PathBuf,
}

impl FileBindingFetcher {
    /// Create a fetcher reading from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File this fetcher reads
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(&self, contents: &str) -> Result<Vec<Binding>> {
        let file: BindingsFile =
            toml::from_str(contents).map_err(|e| BindingError::parse(&self.path, e))?;

        let mut bindings = Vec::with_capacity(file.bindings.len());
        for binding in file.bindings {
            if binding.application_id.is_empty() {
                return Err(BindingError::invalid(
                    &self.path,
                    format!("binding for drain '{}' has no application_id", binding.drain_url),
                ));
            }
            if let Err(e) = binding.drain() {
                warn!(path = %self.path.display(), binding = %binding, error = %e, "skipping binding with invalid drain url");
                continue;
            }
            bindings.push(binding);
        }
        Ok(bindings)
    }
}

#[async_trait]
impl BindingFetcher for FileBindingFetcher {
    async fn fetch_bindings(&self) -> Result<Vec<Binding>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BindingError::io(&self.path, e)),
        };
        self.parse(&contents)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
