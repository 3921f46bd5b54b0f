//! Conduit - Sources
//!
//! The ingestion boundary: network sources that decode envelopes and hand
//! them, one at a time, to an [`EnvelopeSink`].
//!
//! # Available Sources
//!
//! - **TCP** - length-prefixed JSON envelope batches (see `conduit_protocol`)
//!
//! # Guarantees
//!
//! Every envelope handed to a sink carries a non-zero timestamp. Producers
//! that leave it unset get the time of receipt.
//!
//! # Example
//!
//! ```ignore
//! use conduit_sources::{TcpSource, TcpSourceConfig};
//!
//! let source = TcpSource::new(TcpSourceConfig::with_port(3458), agent.clone());
//! source.run(cancel.child_token()).await?;
//! ```

mod common;
pub mod tcp;

use std::sync::Arc;

use conduit_protocol::Envelope;

pub use common::{MetricsSnapshot, SourceMetrics};
pub use tcp::{SourceError, TcpSource, TcpSourceConfig};

/// Receiver of decoded envelopes
///
/// Called once per envelope from the connection task that decoded it, so
/// implementations must not block.
pub trait EnvelopeSink: Send + Sync {
    fn accept(&self, envelope: Envelope);
}

impl<T: EnvelopeSink + ?Sized> EnvelopeSink for Arc<T> {
    #[inline]
    fn accept(&self, envelope: Envelope) {
        (**self).accept(envelope)
    }
}
