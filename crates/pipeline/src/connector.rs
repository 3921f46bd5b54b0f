//! Downstream connection seam
//!
//! A [`Connector`] turns a [`Binding`] into a live [`Connection`]. The registry
//! never knows the transport; each consumer task owns its connection.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use conduit_protocol::{Binding, Envelope};

use crate::{PipelineError, Result};

/// An established link to one downstream
#[async_trait]
pub trait Connection: Send {
    /// Deliver a batch, in order
    ///
    /// Returns how many envelopes were written. Envelopes the transport cannot
    /// carry (too large for one frame) are skipped and left out of the count;
    /// the connection stays usable. An error closes the consumer that owns
    /// this connection.
    async fn send(&mut self, batch: &[Arc<Envelope>]) -> Result<usize>;
}

/// Opens connections for bindings
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, binding: &Binding) -> Result<Box<dyn Connection>>;

    /// Connector name for logging
    fn name(&self) -> &'static str;
}

/// Dispatches to a connector by drain URL scheme
///
/// ```ignore
/// let connector = SchemeConnector::new().with("tcp", Arc::new(TcpConnector::new(config)));
/// ```
#[derive(Default, Clone)]
pub struct SchemeConnector {
    connectors: HashMap<String, Arc<dyn Connector>>,
}

impl SchemeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connector` for `scheme` (case-insensitive)
    pub fn with(mut self, scheme: &str, connector: Arc<dyn Connector>) -> Self {
        self.connectors.insert(scheme.to_ascii_lowercase(), connector);
        self
    }

    /// Registered schemes, sorted
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.connectors.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }
}

impl fmt::Debug for SchemeConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemeConnector")
            .field("schemes", &self.schemes())
            .finish()
    }
}

#[async_trait]
impl Connector for SchemeConnector {
    async fn connect(&self, binding: &Binding) -> Result<Box<dyn Connection>> {
        let drain = binding.drain()?;
        let connector = self
            .connectors
            .get(drain.scheme())
            .ok_or_else(|| PipelineError::UnsupportedScheme(drain.scheme().to_string()))?;
        connector.connect(binding).await
    }

    fn name(&self) -> &'static str {
        "scheme"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Null;

    #[async_trait]
    impl Connection for Null {
        async fn send(&mut self, batch: &[Arc<Envelope>]) -> Result<usize> {
            Ok(batch.len())
        }
    }

    struct NullConnector;

    #[async_trait]
    impl Connector for NullConnector {
        async fn connect(&self, _binding: &Binding) -> Result<Box<dyn Connection>> {
            Ok(Box::new(Null))
        }

        fn name(&self) -> &'static str {
            "null"
        }
    }

    #[tokio::test]
    async fn test_dispatches_by_scheme() {
        let connector = SchemeConnector::new().with("TCP", Arc::new(NullConnector));

        let binding = Binding::new("a", "h", "tcp://127.0.0.1:1");
        assert!(connector.connect(&binding).await.is_ok());
        assert_eq!(connector.schemes(), vec!["tcp"]);
    }

    #[tokio::test]
    async fn test_unknown_scheme() {
        let connector = SchemeConnector::new().with("tcp", Arc::new(NullConnector));
        let binding = Binding::new("a", "h", "syslog://127.0.0.1:1");

        let err = connector.connect(&binding).await.err().unwrap();
        assert!(matches!(err, PipelineError::UnsupportedScheme(s) if s == "syslog"));
    }

    #[tokio::test]
    async fn test_invalid_drain() {
        let connector = SchemeConnector::new().with("tcp", Arc::new(NullConnector));
        let binding = Binding::new("a", "h", "nonsense");

        let err = connector.connect(&binding).await.err().unwrap();
        assert!(matches!(err, PipelineError::InvalidDrain(_)));
    }
}
