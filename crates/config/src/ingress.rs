//! Ingress listener configuration

use serde::Deserialize;

/// Default ingress port
pub const DEFAULT_INGRESS_PORT: u16 = 3458;

/// Default frame size limit (16MB), also the largest frame egress writes
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// TCP ingress configuration
///
/// # Example
///
/// ```toml
/// [ingress]
/// address = "127.0.0.1"
/// port = 3458
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngressConfig {
    /// Bind address
    /// Default: "127.0.0.1"
    pub address: String,

    /// Bind port; 0 picks an ephemeral port
    /// Default: 3458
    pub port: u16,

    /// Largest frame body accepted from a producer
    /// Default: 16MB, which is also the upper bound
    pub max_frame_size: usize,

    /// Read buffer size per connection
    /// Default: 64KB
    pub buffer_size: usize,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".into(),
            port: DEFAULT_INGRESS_PORT,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            buffer_size: 64 * 1024,
        }
    }
}

impl IngressConfig {
    /// `address:port` to bind
    pub fn bind_address(&self) -> String {
        if self.address.contains(':') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}
