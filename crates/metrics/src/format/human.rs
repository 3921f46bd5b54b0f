//! Human-readable metrics formatter
//!
//! # Example Output
//!
//! ```text
//! [metrics] gauges: active_bindings=3
//! [metrics] counters: dropped{direction=ingress}=12 (+2) | egress=1.2M (+40.0K) | ingress=1.2M (+40.0K)
//! ```

use std::fmt::Write;

use super::{MetricsFormatter, format_count};
use crate::MetricsSnapshot;

/// Human-readable metrics formatter
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter;

impl HumanFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl MetricsFormatter for HumanFormatter {
    fn format(&self, current: &MetricsSnapshot, previous: Option<&MetricsSnapshot>) -> String {
        let mut lines = Vec::with_capacity(2);

        if !current.gauges.is_empty() {
            let mut line = String::from("[metrics] gauges:");
            for (i, sample) in current.gauges.iter().enumerate() {
                if i > 0 {
                    line.push_str(" |");
                }
                let _ = write!(line, " {}={}", sample.key, sample.value);
            }
            lines.push(line);
        }

        if !current.counters.is_empty() {
            let mut line = String::from("[metrics] counters:");
            for (i, sample) in current.counters.iter().enumerate() {
                if i > 0 {
                    line.push_str(" |");
                }
                let _ = write!(line, " {}={}", sample.key, format_count(sample.value));
                if let Some(delta) = previous.and_then(|p| current.counter_delta(sample, p)) {
                    let _ = write!(line, " (+{})", format_count(delta));
                }
            }
            lines.push(line);
        }

        if lines.is_empty() {
            return "[metrics] no metrics registered".to_string();
        }
        lines.join("\n")
    }
}
