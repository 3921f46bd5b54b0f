//! Consumer registry metrics
//!
//! Counters are resolved from the shared [`MetricsRegistry`] once, at
//! construction, so the write path only touches atomics.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use conduit_metrics::{Counter, Gauge, MetricsRegistry};
use conduit_protocol::Binding;
use parking_lot::Mutex;

/// Gauge: consumers registered after the last reconcile pass
pub const ACTIVE_BINDINGS: &str = "active_bindings";
/// Counter: envelopes dropped because a consumer queue was full
pub const DROPPED: &str = "dropped";
/// Counter: envelopes delivered downstream
pub const EGRESS: &str = "egress";
/// Counter: enqueue attempts on a consumer whose task already exited
pub const FAILED_SENDS: &str = "failed_sends";
/// Counter: envelopes a connection skipped because they cannot fit in a frame
pub const REJECTED: &str = "rejected";

/// Label set for drops on the ingress side of the consumer queues
pub const INGRESS_DIRECTION: &[(&str, &str)] = &[("direction", "ingress")];

/// Metrics for the consumer registry
#[derive(Debug)]
pub struct RegistryMetrics {
    pub(crate) active_bindings: Arc<Gauge>,
    pub(crate) dropped: Arc<Counter>,
    pub(crate) egress: Arc<Counter>,
    pub(crate) failed_sends: Arc<Counter>,
    pub(crate) rejected: Arc<Counter>,
}

impl RegistryMetrics {
    pub fn new(registry: &MetricsRegistry) -> Self {
        Self {
            active_bindings: registry.gauge(ACTIVE_BINDINGS, &[]),
            dropped: registry.counter(DROPPED, INGRESS_DIRECTION),
            egress: registry.counter(EGRESS, &[]),
            failed_sends: registry.counter(FAILED_SENDS, &[]),
            rejected: registry.counter(REJECTED, &[]),
        }
    }

    #[inline]
    pub fn active_bindings(&self) -> u64 {
        self.active_bindings.get()
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.get()
    }

    #[inline]
    pub fn egress(&self) -> u64 {
        self.egress.get()
    }

    #[inline]
    pub fn failed_sends(&self) -> u64 {
        self.failed_sends.get()
    }

    #[inline]
    pub fn rejected(&self) -> u64 {
        self.rejected.get()
    }
}

// ============================================================================
// Backpressure Tracker
// ============================================================================

/// Summary window for drop logging
const LOG_INTERVAL: Duration = Duration::from_secs(1);
/// Drops by one consumer within a window that escalate to ERROR
const CRITICAL_DROP_THRESHOLD: u64 = 100;

/// Drops seen within one window, closed by [`BackpressureTracker`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropSummary {
    /// Envelopes dropped across all consumers
    pub total: u64,
    /// Consumers that dropped at least one envelope
    pub consumers: usize,
    /// Consumer with the most drops
    pub worst: Binding,
    pub worst_dropped: u64,
}

struct DropWindow {
    started: Instant,
    per_binding: HashMap<Binding, u64>,
}

/// Per-consumer drop accounting with one log line per window
///
/// Full queues are reported as a summary naming how many consumers fell
/// behind and which one is furthest behind. WARN by default, ERROR once a
/// single consumer drops more than 100 envelopes in a window.
pub struct BackpressureTracker {
    interval: Duration,
    window: Mutex<DropWindow>,
}

impl BackpressureTracker {
    pub fn new() -> Self {
        Self::with_interval(LOG_INTERVAL)
    }

    /// Tracker closing a window every `interval`
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            window: Mutex::new(DropWindow {
                started: Instant::now(),
                per_binding: HashMap::new(),
            }),
        }
    }

    /// Record one envelope dropped for `binding`
    ///
    /// Returns the summary when this drop closed a window; it has been logged.
    pub fn record_drop(&self, binding: &Binding) -> Option<DropSummary> {
        let summary = {
            let mut window = self.window.lock();
            match window.per_binding.get_mut(binding) {
                Some(count) => *count += 1,
                None => {
                    window.per_binding.insert(binding.clone(), 1);
                }
            }

            if window.started.elapsed() < self.interval {
                return None;
            }
            window.started = Instant::now();
            summarize(std::mem::take(&mut window.per_binding))
        }?;

        if summary.worst_dropped > CRITICAL_DROP_THRESHOLD {
            tracing::error!(
                dropped_envelopes = summary.total,
                consumers = summary.consumers,
                worst_binding = %summary.worst,
                worst_dropped = summary.worst_dropped,
                threshold = CRITICAL_DROP_THRESHOLD,
                "high backpressure: consumer cannot keep up"
            );
        } else {
            tracing::warn!(
                dropped_envelopes = summary.total,
                consumers = summary.consumers,
                worst_binding = %summary.worst,
                worst_dropped = summary.worst_dropped,
                "backpressure: consumer queues full"
            );
        }

        Some(summary)
    }

    /// Drops recorded in the open window
    pub fn pending(&self) -> u64 {
        self.window.lock().per_binding.values().sum()
    }
}

fn summarize(per_binding: HashMap<Binding, u64>) -> Option<DropSummary> {
    let total = per_binding.values().sum();
    let consumers = per_binding.len();
    let (worst, worst_dropped) = per_binding
        .into_iter()
        .max_by(|(a, x), (b, y)| x.cmp(y).then_with(|| b.cmp(a)))?;

    Some(DropSummary {
        total,
        consumers,
        worst,
        worst_dropped,
    })
}

impl Default for BackpressureTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BackpressureTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackpressureTracker")
            .field("interval", &self.interval)
            .field("pending", &self.pending())
            .finish()
    }
}
