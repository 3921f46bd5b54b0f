//! Conduit - Forwarder agent
//!
//! Ties the pieces of the forwarder together:
//!
//! ```text
//! TcpSource ──accept──► ForwarderAgent::process ──► Chain (Tagger → CounterAggregator)
//!                                                     │
//!                                                     ▼
//!                                        ConsumerRegistry::write ──► consumers
//!
//! ForwarderAgent::run ──tick──► BindingFetcher::fetch_bindings ──► ConsumerRegistry::reconcile
//! ```
//!
//! The agent owns its aggregator, registry, fetcher and metrics; nothing is
//! process-global, so several agents can live in one test binary.

mod agent;
mod builder;
mod error;

pub use agent::{
    AgentSettings, BINDING_FETCH_ERRORS, DEFAULT_POLL_INTERVAL, ForwarderAgent, INGRESS,
    PROCESS_ERRORS,
};
pub use builder::{connector_from_config, consumer_config, fetcher_from_config, source_config};
pub use error::{AgentError, Result};

#[cfg(test)]
mod agent_test;
