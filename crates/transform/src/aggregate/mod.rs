//! Counter Aggregator - running totals for counter deltas
//!
//! Producers emit counters as deltas. The aggregator keeps one running total
//! per `(source_id, counter name)` and stamps it into each counter envelope's
//! `total` before the envelope leaves the agent. `delta` is left untouched.
//!
//! # Concurrency
//!
//! Totals live in per-key `AtomicU64` cells behind a `RwLock`ed map:
//! - existing keys are updated under the shared read lock with a single
//!   `fetch_add`, so different keys never block each other and concurrent
//!   updates to the same key are never lost
//! - the write lock is only taken the first time a key is observed

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use conduit_protocol::{Envelope, Payload};
use parking_lot::RwLock;

use crate::{Processor, TransformResult};

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;

/// Running counter totals keyed by source id, then counter name
type Totals = HashMap<String, HashMap<String, AtomicU64>>;

/// Accumulates counter deltas into running totals
#[derive(Debug, Default)]
pub struct CounterAggregator {
    totals: RwLock<Totals>,
}

impl CounterAggregator {
    /// Create an aggregator with no state
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `delta` to the total for the key and return the new total
    ///
    /// Totals wrap on overflow.
    pub fn add(&self, source_id: &str, name: &str, delta: u64) -> u64 {
        {
            let totals = self.totals.read();
            if let Some(cell) = totals.get(source_id).and_then(|names| names.get(name)) {
                return cell.fetch_add(delta, Ordering::Relaxed).wrapping_add(delta);
            }
        }

        // First observation of this key: another task may have raced us here,
        // `entry` keeps whichever cell was inserted first.
        let mut totals = self.totals.write();
        let cell = totals
            .entry(source_id.to_string())
            .or_default()
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(source_id, counter = name, "tracking new counter");
                AtomicU64::new(0)
            });
        cell.fetch_add(delta, Ordering::Relaxed).wrapping_add(delta)
    }

    /// Current total for the key, if it has been observed
    pub fn total(&self, source_id: &str, name: &str) -> Option<u64> {
        self.totals
            .read()
            .get(source_id)
            .and_then(|names| names.get(name))
            .map(|cell| cell.load(Ordering::Relaxed))
    }

    /// Reset the total for the key to zero, returning the previous total
    pub fn reset(&self, source_id: &str, name: &str) -> Option<u64> {
        self.totals
            .read()
            .get(source_id)
            .and_then(|names| names.get(name))
            .map(|cell| cell.swap(0, Ordering::Relaxed))
    }

    /// Number of distinct `(source_id, name)` keys observed
    pub fn key_count(&self) -> usize {
        self.totals.read().values().map(HashMap::len).sum()
    }
}

impl Processor for CounterAggregator {
    fn process(&self, envelope: &mut Envelope) -> TransformResult<()> {
        let Envelope {
            source_id, payload, ..
        } = envelope;

        if let Payload::Counter(counter) = payload {
            counter.total = self.add(source_id, &counter.name, counter.delta);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "counter_aggregator"
    }
}
