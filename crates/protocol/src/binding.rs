//! Binding - one downstream routing target
//!
//! Bindings are produced fresh by every fetch and never mutated. Equality and
//! hashing are structural over all three fields, which is what the consumer
//! registry diffs on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Downstream routing target
///
/// # Example
///
/// ```
/// use conduit_protocol::Binding;
///
/// let binding = Binding::new("app-1", "host-1", "tcp://127.0.0.1:3459");
/// let drain = binding.drain().unwrap();
/// assert_eq!(drain.scheme(), "tcp");
/// assert_eq!(drain.address(), "127.0.0.1:3459");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Binding {
    /// Owning workload
    pub application_id: String,

    /// Host of the owning workload
    pub hostname: String,

    /// Connection target; the scheme selects the transport
    pub drain_url: String,
}

impl Binding {
    /// Create a new binding
    pub fn new(
        application_id: impl Into<String>,
        hostname: impl Into<String>,
        drain_url: impl Into<String>,
    ) -> Self {
        Self {
            application_id: application_id.into(),
            hostname: hostname.into(),
            drain_url: drain_url.into(),
        }
    }

    /// Parse the drain URL
    pub fn drain(&self) -> Result<DrainUrl, ProtocolError> {
        self.drain_url.parse()
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} -> {}",
            self.application_id, self.hostname, self.drain_url
        )
    }
}

/// Parsed drain target: `scheme://host:port[/...]`
///
/// IPv6 hosts must be bracketed (`tcp://[::1]:3459`). Anything after the
/// authority is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DrainUrl {
    scheme: String,
    host: String,
    port: u16,
}

impl DrainUrl {
    /// Transport scheme, lowercased
    #[inline]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host without brackets
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Socket address string suitable for `TcpStream::connect`
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for DrainUrl {
    type Err = ProtocolError;

    fn from_str(url: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| ProtocolError::invalid_drain_url(url, "missing scheme"))?;

        if scheme.is_empty() {
            return Err(ProtocolError::invalid_drain_url(url, "empty scheme"));
        }

        // Authority ends at the first path, query or fragment delimiter
        let authority = rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();

        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            let (host, after) = bracketed
                .split_once(']')
                .ok_or_else(|| ProtocolError::invalid_drain_url(url, "unterminated ipv6 host"))?;
            let port = after
                .strip_prefix(':')
                .ok_or_else(|| ProtocolError::invalid_drain_url(url, "missing port"))?;
            (host, port)
        } else {
            authority
                .rsplit_once(':')
                .ok_or_else(|| ProtocolError::invalid_drain_url(url, "missing port"))?
        };

        if host.is_empty() {
            return Err(ProtocolError::invalid_drain_url(url, "empty host"));
        }

        let port = port
            .parse::<u16>()
            .map_err(|_| ProtocolError::invalid_drain_url(url, "invalid port"))?;

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for DrainUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.address())
    }
}
