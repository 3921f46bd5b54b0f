//! Conduit - Transform
//!
//! Processor chain for envelope modification in-flight.
//!
//! # Overview
//!
//! Processors mutate envelopes in place as they flow from the ingestion
//! boundary to the fan-out writer:
//! - `Tagger` - applies static tags and migrates legacy typed tags
//! - `CounterAggregator` - turns counter deltas into running totals
//!
//! # Design Principles
//!
//! - **In place**: processors take `&mut Envelope`, nothing is re-allocated
//! - **Thread-safe**: processors are shared across ingress connections
//! - **Deterministic**: output depends only on the envelope and processor state,
//!   never on which task happened to run it
//!
//! # Architecture
//!
//! ```text
//! [Envelope] → [Tagger] → [CounterAggregator] → [Envelope']
//! ```
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use conduit_protocol::Envelope;
//! use conduit_transform::{Chain, CounterAggregator, Tagger};
//!
//! let mut tags = HashMap::new();
//! tags.insert("deployment".to_string(), "prod".to_string());
//!
//! let chain = Chain::new(vec![
//!     Box::new(Tagger::new(tags)),
//!     Box::new(CounterAggregator::new()),
//! ]);
//!
//! let mut env = Envelope::counter("app", "requests", 20);
//! chain.process(&mut env).unwrap();
//! assert_eq!(env.counter_payload().unwrap().total, 20);
//! assert_eq!(env.tags["deployment"], "prod");
//! ```

mod aggregate;
mod chain;
mod error;
mod tagger;

pub use aggregate::CounterAggregator;
pub use chain::Chain;
pub use error::TransformError;
pub use tagger::Tagger;

use conduit_protocol::Envelope;

/// Result type for processor operations
pub type TransformResult<T> = Result<T, TransformError>;

/// Trait for envelope processors
///
/// Implementors must be `Send + Sync` so one instance can be shared by every
/// ingress task.
///
/// # Example
///
/// ```ignore
/// struct Uppercase;
///
/// impl Processor for Uppercase {
///     fn process(&self, envelope: &mut Envelope) -> TransformResult<()> {
///         envelope.source_id = envelope.source_id.to_uppercase();
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "uppercase"
///     }
/// }
/// ```
pub trait Processor: Send + Sync {
    /// Process an envelope in place
    ///
    /// Returning an error causes the envelope to be dropped.
    fn process(&self, envelope: &mut Envelope) -> TransformResult<()>;

    /// Name of this processor for logging and metrics
    fn name(&self) -> &'static str;

    /// Whether this processor is currently enabled
    ///
    /// Disabled processors are filtered out of chains at construction time.
    fn enabled(&self) -> bool {
        true
    }
}
