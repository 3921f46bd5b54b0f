//! Assembling an agent from configuration

use std::sync::Arc;

use conduit_bindings::{BindingFetcher, FileBindingFetcher, IngressPortFetcher};
use conduit_config::{BindingSourceType, BindingsConfig, Config, EgressConfig, IngressConfig};
use conduit_metrics::MetricsRegistry;
use conduit_pipeline::{Connector, ConsumerConfig, SchemeConnector};
use conduit_sinks::forwarder::{ForwarderConfig, TcpConnector};
use conduit_sources::TcpSourceConfig;

use crate::{AgentSettings, ForwarderAgent, Result};

impl ForwarderAgent {
    /// Build an agent with the fetcher and connectors named by `config`
    pub fn from_config(config: &Config, metrics: Arc<MetricsRegistry>) -> Result<Self> {
        let settings = AgentSettings {
            tags: config.tags.clone(),
            consumer: consumer_config(&config.egress),
            poll_interval: config.bindings.poll_interval,
        };

        Self::new(
            settings,
            fetcher_from_config(&config.bindings),
            connector_from_config(&config.egress),
            metrics,
        )
    }
}

/// Binding fetcher for the configured source type
pub fn fetcher_from_config(config: &BindingsConfig) -> Arc<dyn BindingFetcher> {
    match config.source {
        BindingSourceType::IngressPorts => Arc::new(
            IngressPortFetcher::new(config.path.clone()).with_hostname(config.hostname.as_str()),
        ),
        BindingSourceType::File => Arc::new(FileBindingFetcher::new(config.path.clone())),
    }
}

/// Connector for every supported drain scheme
pub fn connector_from_config(config: &EgressConfig) -> Arc<dyn Connector> {
    let forwarder = ForwarderConfig::default()
        .with_connection_timeout(config.connect_timeout)
        .with_write_timeout(config.send_timeout);

    Arc::new(SchemeConnector::new().with("tcp", Arc::new(TcpConnector::new(forwarder))))
}

pub fn consumer_config(config: &EgressConfig) -> ConsumerConfig {
    ConsumerConfig {
        queue_capacity: config.queue_capacity,
        max_batch_size: config.max_batch_size,
        send_timeout: config.send_timeout,
    }
}

pub fn source_config(config: &IngressConfig) -> TcpSourceConfig {
    TcpSourceConfig {
        address: config.address.clone(),
        port: config.port,
        buffer_size: config.buffer_size,
        max_frame_size: config.max_frame_size,
        ..TcpSourceConfig::default()
    }
}
