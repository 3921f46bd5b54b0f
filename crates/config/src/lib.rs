//! Conduit Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! An empty file is a valid configuration.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use conduit_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[ingress]\nport = 4000").unwrap();
//! assert_eq!(config.ingress.port, 4000);
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! [log]
//! level = "info"
//! format = "console"
//!
//! [ingress]
//! address = "127.0.0.1"
//! port = 3458
//!
//! [bindings]
//! type = "ingress_ports"
//! path = "/var/conduit/downstreams"
//! poll_interval = "15s"
//!
//! [egress]
//! queue_capacity = 10000
//! max_batch_size = 100
//! connect_timeout = "5s"
//! send_timeout = "5s"
//!
//! [tags]
//! deployment = "prod"
//!
//! [metrics]
//! interval = "60s"
//! format = "human"
//! ```

mod bindings;
mod egress;
mod error;
mod ingress;
mod logging;
mod metrics;
mod validation;

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use bindings::{BindingSourceType, BindingsConfig};
pub use egress::EgressConfig;
pub use error::{ConfigError, Result};
pub use ingress::{DEFAULT_INGRESS_PORT, DEFAULT_MAX_FRAME_SIZE, IngressConfig};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use metrics::{MetricsConfig, MetricsFormat};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Producer-facing TCP listener
    pub ingress: IngressConfig,

    /// Binding discovery
    pub bindings: BindingsConfig,

    /// Downstream delivery
    pub egress: EgressConfig,

    /// Static tags added to every envelope
    pub tags: HashMap<String, String>,

    /// Metrics reporting configuration
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
