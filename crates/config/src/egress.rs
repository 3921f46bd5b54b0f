//! Downstream delivery configuration

use serde::Deserialize;
use std::time::Duration;

/// Per-consumer delivery settings
///
/// # Example
///
/// ```toml
/// [egress]
/// queue_capacity = 10000
/// max_batch_size = 100
/// connect_timeout = "5s"
/// send_timeout = "5s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EgressConfig {
    /// Bounded queue depth per consumer; overflow is dropped
    pub queue_capacity: usize,

    /// Envelopes sent per frame at most
    pub max_batch_size: usize,

    /// Downstream connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Downstream write timeout; a timed out consumer is closed
    #[serde(with = "humantime_serde")]
    pub send_timeout: Duration,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10_000,
            max_batch_size: 100,
            connect_timeout: Duration::from_secs(5),
            send_timeout: Duration::from_secs(5),
        }
    }
}
