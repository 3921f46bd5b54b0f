//! Labeled metrics registry
//!
//! Metrics are identified by a name plus a label set. Label order at the call
//! site does not matter: labels are sorted when the key is built.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::{Counter, Gauge};

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

/// Metric identity: name plus sorted labels
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    name: String,
    labels: Vec<(String, String)>,
}

impl MetricKey {
    pub fn new(name: &str, labels: &[(&str, &str)]) -> Self {
        let mut labels: Vec<(String, String)> = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        labels.sort();
        Self {
            name: name.to_string(),
            labels,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn labels(&self) -> &[(String, String)] {
        &self.labels
    }
}

/// Renders as `name` or `name{k=v,k2=v2}`
impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.labels.is_empty() {
            return Ok(());
        }
        f.write_str("{")?;
        for (i, (k, v)) in self.labels.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        f.write_str("}")
    }
}

/// One metric value at snapshot time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSample {
    pub key: MetricKey,
    pub value: u64,
}

/// Point-in-time copy of every registered metric, sorted by key
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub taken_at: Instant,
    pub counters: Vec<MetricSample>,
    pub gauges: Vec<MetricSample>,
}

impl MetricsSnapshot {
    /// Counter increase since `previous`, if the counter existed then
    pub fn counter_delta(&self, sample: &MetricSample, previous: &MetricsSnapshot) -> Option<u64> {
        previous
            .counters
            .binary_search_by(|s| s.key.cmp(&sample.key))
            .ok()
            .map(|i| sample.value.saturating_sub(previous.counters[i].value))
    }
}

/// Registry of counters and gauges keyed by [`MetricKey`]
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: RwLock<HashMap<MetricKey, Arc<Counter>>>,
    gauges: RwLock<HashMap<MetricKey, Arc<Gauge>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the counter for `name` and `labels`
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Arc<Counter> {
        get_or_create(&self.counters, MetricKey::new(name, labels))
    }

    /// Get or create the gauge for `name` and `labels`
    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Arc<Gauge> {
        get_or_create(&self.gauges, MetricKey::new(name, labels))
    }

    /// Current counter value, `None` if never created
    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        self.counters
            .read()
            .get(&MetricKey::new(name, labels))
            .map(|c| c.get())
    }

    /// Current gauge value, `None` if never created
    pub fn gauge_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        self.gauges
            .read()
            .get(&MetricKey::new(name, labels))
            .map(|g| g.get())
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            taken_at: Instant::now(),
            counters: samples(&self.counters, |c| c.get()),
            gauges: samples(&self.gauges, |g| g.get()),
        }
    }
}

fn get_or_create<T: Default>(map: &RwLock<HashMap<MetricKey, Arc<T>>>, key: MetricKey) -> Arc<T> {
    if let Some(metric) = map.read().get(&key) {
        return Arc::clone(metric);
    }
    Arc::clone(map.write().entry(key).or_default())
}

fn samples<T>(map: &RwLock<HashMap<MetricKey, Arc<T>>>, value: impl Fn(&T) -> u64) -> Vec<MetricSample> {
    let mut samples: Vec<MetricSample> = map
        .read()
        .iter()
        .map(|(key, metric)| MetricSample {
            key: key.clone(),
            value: value(metric),
        })
        .collect();
    samples.sort_by(|a, b| a.key.cmp(&b.key));
    samples
}
