//! The forwarder agent
//!
//! Two independent paths run through the agent:
//!
//! - **Ingest**: every envelope from the ingestion boundary is processed by
//!   the chain and written to the registry. Synchronous, never awaits.
//! - **Refresh**: `run` polls the binding fetcher and reconciles the
//!   registry. A failed fetch keeps the previous consumer set in place.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use conduit_bindings::BindingFetcher;
use conduit_metrics::{Counter, MetricsRegistry};
use conduit_pipeline::{ConsumerConfig, ConsumerRegistry, Connector, ReconcileSummary};
use conduit_protocol::{Binding, Envelope};
use conduit_sources::EnvelopeSink;
use conduit_transform::{Chain, CounterAggregator, Tagger};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Result;

/// Envelopes accepted from the ingestion boundary
pub const INGRESS: &str = "ingress";

/// Failed binding fetches
pub const BINDING_FETCH_ERRORS: &str = "binding_fetch_errors";

/// Envelopes dropped because the chain rejected them
pub const PROCESS_ERRORS: &str = "process_errors";

/// Default binding refresh interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Agent construction settings
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Static tags stamped onto every envelope
    pub tags: HashMap<String, String>,
    /// Per-consumer delivery settings
    pub consumer: ConsumerConfig,
    /// How often bindings are re-fetched
    pub poll_interval: Duration,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            tags: HashMap::new(),
            consumer: ConsumerConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Processes envelopes and keeps the consumer set in step with the bindings
pub struct ForwarderAgent {
    chain: Chain,
    registry: ConsumerRegistry,
    fetcher: Arc<dyn BindingFetcher>,
    metrics: Arc<MetricsRegistry>,
    poll_interval: Duration,
    ingress: Arc<Counter>,
    process_errors: Arc<Counter>,
    fetch_errors: Arc<Counter>,
}

impl ForwarderAgent {
    /// Assemble an agent
    ///
    /// # Errors
    ///
    /// Fails when a static tag has an empty name.
    pub fn new(
        settings: AgentSettings,
        fetcher: Arc<dyn BindingFetcher>,
        connector: Arc<dyn Connector>,
        metrics: Arc<MetricsRegistry>,
    ) -> Result<Self> {
        let chain = Chain::new(vec![
            Box::new(Tagger::try_new(settings.tags)?),
            Box::new(CounterAggregator::new()),
        ]);
        let registry = ConsumerRegistry::new(connector, settings.consumer, &metrics);

        Ok(Self {
            chain,
            registry,
            ingress: metrics.counter(INGRESS, &[]),
            process_errors: metrics.counter(PROCESS_ERRORS, &[]),
            fetch_errors: metrics.counter(BINDING_FETCH_ERRORS, &[]),
            fetcher,
            metrics,
            poll_interval: settings.poll_interval,
        })
    }

    #[inline]
    pub fn registry(&self) -> &ConsumerRegistry {
        &self.registry
    }

    #[inline]
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    #[inline]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    #[inline]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Transform one envelope and hand it to every consumer
    ///
    /// Returns the number of consumers that queued it. An envelope the chain
    /// rejects is dropped and counted under `process_errors`.
    pub fn process(&self, mut envelope: Envelope) -> usize {
        self.ingress.inc();

        if let Err(e) = self.chain.process(&mut envelope) {
            self.process_errors.inc();
            debug!(source_id = %envelope.source_id, error = %e, "envelope dropped by chain");
            return 0;
        }

        self.registry.write(envelope)
    }

    /// Fetch bindings once and reconcile
    ///
    /// Returns `None` when the fetch failed; the current consumers are kept.
    pub async fn refresh(&self) -> Option<ReconcileSummary> {
        let fetched = self.fetch().await?;
        Some(self.registry.reconcile(&fetched).await)
    }

    async fn fetch(&self) -> Option<Vec<Binding>> {
        match self.fetcher.fetch_bindings().await {
            Ok(bindings) => Some(bindings),
            Err(e) => {
                self.fetch_errors.inc();
                warn!(
                    fetcher = self.fetcher.name(),
                    error = %e,
                    "binding fetch failed, keeping current consumers"
                );
                None
            }
        }
    }

    /// Run the refresh loop until cancelled, then shut the registry down
    ///
    /// The first refresh happens immediately.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = interval(self.poll_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            fetcher = self.fetcher.name(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "binding refresh started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let fetched = tokio::select! {
                _ = cancel.cancelled() => break,
                fetched = self.fetch() => fetched,
            };

            if let Some(bindings) = fetched {
                self.registry.reconcile(&bindings).await;
            }
        }

        self.registry.shutdown().await;
        info!("binding refresh stopped");
    }
}

impl EnvelopeSink for ForwarderAgent {
    #[inline]
    fn accept(&self, envelope: Envelope) {
        self.process(envelope);
    }
}

impl fmt::Debug for ForwarderAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwarderAgent")
            .field("chain", &self.chain.names())
            .field("registry", &self.registry)
            .field("fetcher", &self.fetcher.name())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}
