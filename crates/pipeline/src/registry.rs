//! Consumer registry - fan-out writer over a dynamic binding set
//!
//! The registry maps each desired [`Binding`] to one consumer. Two paths touch
//! the map:
//!
//! - `write` (hot path): read lock, one `Arc` per envelope, `try_send` to
//!   every consumer queue. Never awaits.
//! - `reconcile` (refresh loop): write lock only while inserting or removing
//!   entries; draining and joining removed consumers happens after the lock
//!   is released.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use conduit_metrics::MetricsRegistry;
use conduit_protocol::{Binding, Envelope};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::connector::Connector;
use crate::consumer::{ConsumerConfig, ConsumerHandle, ConsumerState};
use crate::metrics::{BackpressureTracker, RegistryMetrics};

/// Fan-out writer owning one consumer per binding
///
/// # Example
///
/// ```ignore
/// let registry = ConsumerRegistry::new(connector, ConsumerConfig::default(), &metrics);
///
/// registry.reconcile(&fetcher.fetch_bindings().await?).await;
/// registry.write(envelope);
///
/// registry.shutdown().await;
/// ```
pub struct ConsumerRegistry {
    consumers: RwLock<HashMap<Binding, ConsumerHandle>>,
    connector: Arc<dyn Connector>,
    config: ConsumerConfig,
    metrics: Arc<RegistryMetrics>,
    backpressure: BackpressureTracker,
    /// Parent of every consumer's token
    cancel: CancellationToken,
    /// Serializes reconcile passes and shutdown
    pass: Mutex<()>,
}

/// Outcome of one reconcile pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: usize,
    pub removed: usize,
    /// Consumers found closed and pruned before diffing
    pub pruned: usize,
    pub active: usize,
}

impl ConsumerRegistry {
    pub fn new(
        connector: Arc<dyn Connector>,
        config: ConsumerConfig,
        metrics: &MetricsRegistry,
    ) -> Self {
        Self {
            consumers: RwLock::new(HashMap::new()),
            connector,
            config,
            metrics: Arc::new(RegistryMetrics::new(metrics)),
            backpressure: BackpressureTracker::new(),
            cancel: CancellationToken::new(),
            pass: Mutex::new(()),
        }
    }

    #[inline]
    pub fn metrics(&self) -> &RegistryMetrics {
        &self.metrics
    }

    #[inline]
    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Number of registered consumers
    pub fn len(&self) -> usize {
        self.consumers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.read().is_empty()
    }

    /// Registered bindings, sorted
    pub fn bindings(&self) -> Vec<Binding> {
        let mut bindings: Vec<Binding> = self.consumers.read().keys().cloned().collect();
        bindings.sort();
        bindings
    }

    /// State of the consumer for `binding`, `None` if not registered
    pub fn state(&self, binding: &Binding) -> Option<ConsumerState> {
        self.consumers.read().get(binding).map(ConsumerHandle::state)
    }

    /// Hand one envelope to every consumer
    ///
    /// A full queue drops the envelope for that consumer only. Returns the
    /// number of consumers that accepted it.
    pub fn write(&self, envelope: Envelope) -> usize {
        let envelope = Arc::new(envelope);
        let consumers = self.consumers.read();
        let mut accepted = 0;

        for (binding, handle) in consumers.iter() {
            match handle.try_send(Arc::clone(&envelope)) {
                Ok(()) => accepted += 1,
                Err(TrySendError::Full(_)) => {
                    self.metrics.dropped.inc();
                    self.backpressure.record_drop(binding);
                    debug!(binding = %binding, "consumer queue full (backpressure)");
                }
                Err(TrySendError::Closed(_)) => {
                    self.metrics.failed_sends.inc();
                    debug!(binding = %binding, "consumer queue closed, awaiting reconcile");
                }
            }
        }

        accepted
    }

    /// Converge the consumer set on `bindings`
    ///
    /// Duplicates in `bindings` collapse to one consumer. Consumers whose task
    /// already exited are pruned first, so a still-desired binding with a
    /// failed connection is re-created in the same pass.
    pub async fn reconcile(&self, bindings: &[Binding]) -> ReconcileSummary {
        let _pass = self.pass.lock().await;
        let desired: HashSet<&Binding> = bindings.iter().collect();

        let mut pruned = Vec::new();
        let mut removed = Vec::new();
        let mut added = 0;
        let active;
        {
            let mut consumers = self.consumers.write();

            let closed: Vec<Binding> = consumers
                .iter()
                .filter(|(_, handle)| handle.is_closed())
                .map(|(binding, _)| binding.clone())
                .collect();
            pruned.extend(closed.iter().filter_map(|b| consumers.remove(b)));

            let stale: Vec<Binding> = consumers
                .keys()
                .filter(|b| !desired.contains(b))
                .cloned()
                .collect();
            removed.extend(stale.iter().filter_map(|b| consumers.remove(b)));

            for binding in desired {
                if consumers.contains_key(binding) {
                    continue;
                }
                let handle = ConsumerHandle::spawn(
                    binding.clone(),
                    Arc::clone(&self.connector),
                    &self.config,
                    Arc::clone(&self.metrics),
                    self.cancel.child_token(),
                );
                consumers.insert(binding.clone(), handle);
                added += 1;
            }

            active = consumers.len();
        }

        for handle in &removed {
            info!(binding = %handle.binding(), "binding removed, draining consumer");
        }
        let summary = ReconcileSummary {
            added,
            removed: removed.len(),
            pruned: pruned.len(),
            active,
        };

        for handle in pruned.into_iter().chain(removed) {
            handle.close().await;
        }

        self.metrics.active_bindings.set(active as u64);

        if summary.added > 0 || summary.removed > 0 || summary.pruned > 0 {
            info!(
                added = summary.added,
                removed = summary.removed,
                pruned = summary.pruned,
                active = summary.active,
                "bindings reconciled"
            );
        }

        summary
    }

    /// Cancel and join every consumer
    pub async fn shutdown(&self) {
        let _pass = self.pass.lock().await;
        self.cancel.cancel();

        let handles: Vec<ConsumerHandle> = {
            let mut consumers = self.consumers.write();
            consumers.drain().map(|(_, handle)| handle).collect()
        };

        let count = handles.len();
        for handle in handles {
            handle.close().await;
        }

        self.metrics.active_bindings.set(0);
        info!(consumers = count, "consumer registry shut down");
    }
}

impl Drop for ConsumerRegistry {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for ConsumerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerRegistry")
            .field("consumers", &self.len())
            .field("connector", &self.connector.name())
            .field("config", &self.config)
            .finish()
    }
}
