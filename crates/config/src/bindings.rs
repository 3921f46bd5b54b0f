//! Binding discovery configuration

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Where the desired binding set comes from
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BindingSourceType {
    /// One sub-directory per local downstream, each with `ingress_port.toml`
    #[default]
    IngressPorts,
    /// TOML file of `[[bindings]]` tables
    File,
}

/// Binding discovery configuration
///
/// # Example
///
/// ```toml
/// [bindings]
/// type = "ingress_ports"
/// path = "/var/conduit/downstreams"
/// poll_interval = "15s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BindingsConfig {
    #[serde(rename = "type")]
    pub source: BindingSourceType,

    /// Port directory root or bindings file, depending on `type`
    pub path: PathBuf,

    /// Host downstream agents listen on (`ingress_ports` only)
    pub hostname: String,

    /// How often the desired set is re-fetched
    /// Default: 15s
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for BindingsConfig {
    fn default() -> Self {
        Self {
            source: BindingSourceType::IngressPorts,
            path: PathBuf::from("/var/conduit/downstreams"),
            hostname: "127.0.0.1".into(),
            poll_interval: Duration::from_secs(15),
        }
    }
}
