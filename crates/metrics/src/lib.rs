//! Conduit - Metrics
//!
//! Internal metrics for the forwarder agent.
//!
//! # Overview
//!
//! This crate provides:
//! - Lock-free atomic `Counter` and `Gauge`
//! - `MetricsRegistry`: get-or-create metrics by name and label set
//! - `MetricsReporter`: periodic snapshot logging in human or JSON format
//!
//! # Design Principles
//!
//! - **Lock-free updates**: components resolve their `Arc<Counter>` once and
//!   then only touch atomics on the hot path
//! - **Independent label sets**: `dropped{direction=ingress}` and
//!   `dropped{direction=egress}` are distinct metrics
//! - **Queryable**: tests read values back through the registry
//!
//! # Example
//!
//! ```
//! use conduit_metrics::MetricsRegistry;
//!
//! let registry = MetricsRegistry::new();
//! let dropped = registry.counter("dropped", &[("direction", "ingress")]);
//! dropped.inc();
//!
//! assert_eq!(registry.counter_value("dropped", &[("direction", "ingress")]), Some(1));
//! assert_eq!(registry.counter_value("dropped", &[("direction", "egress")]), None);
//! ```

pub mod format;
mod registry;
mod reporter;

pub use format::{HumanFormatter, JsonFormatter, MetricsFormatter};
pub use registry::{MetricKey, MetricSample, MetricsRegistry, MetricsSnapshot};
pub use reporter::MetricsReporter;

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter wrapper for convenient metric operations
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Create a new counter initialized to 0
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increment the counter by `val` (relaxed ordering for performance)
    #[inline]
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    /// Increment the counter by 1
    #[inline]
    pub fn inc(&self) {
        self.add(1);
    }

    /// Get the current value (relaxed ordering)
    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Atomic gauge: a value that is set rather than accumulated
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    #[inline]
    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::new();
        counter.inc();
        counter.add(41);
        assert_eq!(counter.get(), 42);
    }

    #[test]
    fn test_gauge_overwrites() {
        let gauge = Gauge::new();
        gauge.set(3);
        gauge.set(2);
        assert_eq!(gauge.get(), 2);
    }
}
