//! Conduit - Pipeline
//!
//! Fans processed envelopes out to a dynamic set of downstream consumers.
//!
//! # Architecture
//!
//! ```text
//!                                   ┌──→ [queue] ──→ consumer task ──→ Connection (app-1)
//! write(Envelope) ──→ Arc<Envelope> ┼──→ [queue] ──→ consumer task ──→ Connection (app-2)
//!                                   └──→ [queue] ──→ consumer task ──→ Connection (app-3)
//!
//! reconcile(&[Binding]) ──→ spawn / drain+join consumers ──→ active_bindings gauge
//! ```
//!
//! # Key Design
//!
//! - **Arc fan-out**: each envelope is wrapped in `Arc` once for every consumer
//! - **Backpressure**: `try_send` into bounded queues; overflow is dropped and
//!   counted as `dropped{direction=ingress}`
//! - **Size-aware egress**: connections split batches into frames by encoded
//!   size; an envelope too large for any frame is counted as `rejected`
//!   without closing the consumer
//! - **Isolation**: one task per consumer, so a stalled downstream only fills
//!   its own queue
//! - **Owned tasks**: every consumer task is cancelled and joined when its
//!   binding goes away and on shutdown
//! - **Transport-agnostic**: consumers connect through the `Connector` seam

mod connector;
mod consumer;
mod error;
mod metrics;
mod registry;

pub use connector::{Connection, Connector, SchemeConnector};
pub use consumer::{
    ConsumerConfig, ConsumerState, DEFAULT_MAX_BATCH_SIZE, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_SEND_TIMEOUT,
};
pub use error::{PipelineError, Result};
pub use metrics::{
    ACTIVE_BINDINGS, BackpressureTracker, DROPPED, DropSummary, EGRESS, FAILED_SENDS,
    INGRESS_DIRECTION, REJECTED, RegistryMetrics,
};
pub use registry::{ConsumerRegistry, ReconcileSummary};
