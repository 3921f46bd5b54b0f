//! Ingress port directory fetcher
//!
//! Discovers downstream agents running on the same host. Each downstream owns
//! one sub-directory of the root and advertises its ingress port there:
//!
//! ```text
//! <root>/
//!   syslog-agent/ingress_port.toml    ingress = 3460
//!   metrics-agent/ingress_port.toml   ingress = 3461
//! ```
//!
//! Every advertised port becomes a `tcp://<hostname>:<port>` binding whose
//! application id is the sub-directory name.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use conduit_protocol::Binding;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{BindingError, BindingFetcher, Result};

#[cfg(test)]
#[path = "ports_test.rs"]
mod tests;

/// File each downstream writes into its own sub-directory
pub const PORT_FILE_NAME: &str = "ingress_port.toml";

/// Host the downstream agents listen on unless configured otherwise
pub const DEFAULT_HOSTNAME: &str = "127.0.0.1";

#[derive(Debug, Deserialize)]
struct IngressPort {
    ingress: u16,
}

/// Fetches bindings from per-downstream `ingress_port.toml` files
#[derive(Debug, Clone)]
pub struct IngressPortFetcher {
    root: PathBuf,
    hostname: String,
}

impl IngressPortFetcher {
    /// Create a fetcher scanning `root` with the default hostname
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            hostname: DEFAULT_HOSTNAME.to_string(),
        }
    }

    /// Set the host the downstream agents listen on
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Directory scanned for downstream sub-directories
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn binding(&self, application_id: String, port: u16) -> Binding {
        let drain_url = if self.hostname.contains(':') {
            format!("tcp://[{}]:{}", self.hostname, port)
        } else {
            format!("tcp://{}:{}", self.hostname, port)
        };
        Binding::new(application_id, self.hostname.clone(), drain_url)
    }

    /// Read one downstream's port file
    ///
    /// `Ok(None)` when the sub-directory has no port file or the file is
    /// malformed; only I/O failures on an existing file are errors.
    async fn read_port(&self, dir: &Path) -> Result<Option<u16>> {
        let path = dir.join(PORT_FILE_NAME);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BindingError::io(path, e)),
        };

        match toml::from_str::<IngressPort>(&contents) {
            Ok(port) => Ok(Some(port.ingress)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed ingress port file");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl BindingFetcher for IngressPortFetcher {
    async fn fetch_bindings(&self) -> Result<Vec<Binding>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(root = %self.root.display(), "ingress port root does not exist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(BindingError::io(&self.root, e)),
        };

        let mut bindings = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BindingError::io(&self.root, e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| BindingError::io(entry.path(), e))?
                .is_dir();
            if !is_dir {
                continue;
            }

            let Some(port) = self.read_port(&entry.path()).await? else {
                continue;
            };

            let application_id = entry.file_name().to_string_lossy().into_owned();
            bindings.push(self.binding(application_id, port));
        }

        bindings.sort();
        Ok(bindings)
    }

    fn name(&self) -> &'static str {
        "ingress_ports"
    }
}
