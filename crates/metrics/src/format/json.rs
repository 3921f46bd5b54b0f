//! JSON metrics formatter
//!
//! Formats metrics as one structured JSON object per report.
//!
//! # Example Output
//!
//! ```json
//! {
//!   "type": "metrics",
//!   "gauges": [{"name": "active_bindings", "value": 3}],
//!   "counters": [
//!     {"name": "dropped", "labels": {"direction": "ingress"}, "value": 12, "delta": 2}
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use super::MetricsFormatter;
use crate::{MetricSample, MetricsSnapshot};

/// JSON metrics formatter
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    #[serde(rename = "type")]
    report_type: &'static str,
    gauges: Vec<SampleJson<'a>>,
    counters: Vec<SampleJson<'a>>,
}

#[derive(Serialize)]
struct SampleJson<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<&'a str, &'a str>,
    value: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    delta: Option<u64>,
}

impl<'a> SampleJson<'a> {
    fn new(sample: &'a MetricSample, delta: Option<u64>) -> Self {
        Self {
            name: sample.key.name(),
            labels: sample
                .key
                .labels()
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            value: sample.value,
            delta,
        }
    }
}

impl MetricsFormatter for JsonFormatter {
    fn format(&self, current: &MetricsSnapshot, previous: Option<&MetricsSnapshot>) -> String {
        let report = ReportJson {
            report_type: "metrics",
            gauges: current
                .gauges
                .iter()
                .map(|s| SampleJson::new(s, None))
                .collect(),
            counters: current
                .counters
                .iter()
                .map(|s| SampleJson::new(s, previous.and_then(|p| current.counter_delta(s, p))))
                .collect(),
        };

        serde_json::to_string(&report).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MetricsRegistry;

    #[test]
    fn test_json_structure() {
        let registry = MetricsRegistry::new();
        registry.gauge("active_bindings", &[]).set(2);
        let dropped = registry.counter("dropped", &[("direction", "ingress")]);
        dropped.add(4);
        let previous = registry.snapshot();
        dropped.inc();

        let output = JsonFormatter::new().format(&registry.snapshot(), Some(&previous));
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["type"], "metrics");
        assert_eq!(value["gauges"][0]["name"], "active_bindings");
        assert_eq!(value["gauges"][0]["value"], 2);
        assert!(value["gauges"][0].get("labels").is_none());
        assert_eq!(value["counters"][0]["labels"]["direction"], "ingress");
        assert_eq!(value["counters"][0]["value"], 5);
        assert_eq!(value["counters"][0]["delta"], 1);
    }
}
