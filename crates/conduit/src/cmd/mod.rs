//! CLI commands

pub mod check;
pub mod serve;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use conduit_config::Config;

/// Config files tried, in order, when `--config` is not given
const DEFAULT_CONFIG_PATHS: &[&str] = &["conduit.toml", "/etc/conduit/conduit.toml"];

/// Load configuration
///
/// An explicit path must exist. Without one, the default locations are tried
/// and built-in defaults are used if none exists.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        return Config::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()));
    }

    for candidate in DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from) {
        if candidate.exists() {
            return Config::from_file(&candidate).with_context(|| {
                format!("failed to load configuration from {}", candidate.display())
            });
        }
    }

    Ok(Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/conduit.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_explicit_path_is_loaded() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[ingress]\nport = 4100").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.ingress.port, 4100);
    }

    #[test]
    fn test_invalid_file_carries_context() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[egress]\nqueue_capacity = 0").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("failed to load configuration"));
    }
}
