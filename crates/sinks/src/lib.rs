//! Conduit - Sinks
//!
//! Downstream transports. Each sink implements the pipeline's `Connector`
//! seam; a consumer task owns the resulting `Connection` and feeds it batches
//! from its queue.
//!
//! ```text
//! [ConsumerRegistry] --Arc<Envelope>--> [Consumer Queue] --> [Consumer Task] --> Connection --> downstream
//! ```
//!
//! # Available Sinks
//!
//! | Sink | Drain scheme | Purpose |
//! |------|--------------|---------|
//! | `forwarder` | `tcp://` | Length-prefixed frames to another agent |
//!
//! # Example
//!
//! ```ignore
//! use conduit_pipeline::SchemeConnector;
//! use conduit_sinks::forwarder::{ForwarderConfig, TcpConnector};
//!
//! let connector = SchemeConnector::new()
//!     .with("tcp", Arc::new(TcpConnector::new(ForwarderConfig::default())));
//! ```

/// Forwarder sink - agent-to-agent delivery over TCP
pub mod forwarder;
