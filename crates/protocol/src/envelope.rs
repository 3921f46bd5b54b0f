//! Envelope - one observability event
//!
//! An `Envelope` is constructed by the ingestion boundary, mutated in place by
//! the processor chain, then shared read-only (`Arc<Envelope>`) with every
//! downstream consumer.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One observability event flowing through the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Nanoseconds since the Unix epoch. Zero is invalid downstream.
    #[serde(default)]
    pub timestamp: i64,

    /// Origin application or component
    #[serde(default)]
    pub source_id: String,

    /// Instance of the origin (carried through untouched)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance_id: String,

    /// Unified string tags
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,

    /// Legacy typed tags, migrated into `tags` by the tagger
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub deprecated_tags: HashMap<String, Value>,

    /// Event body
    pub payload: Payload,
}

impl Envelope {
    /// Create an envelope with the given source and payload
    ///
    /// The timestamp is left at zero; producers are expected to set it.
    pub fn new(source_id: impl Into<String>, payload: Payload) -> Self {
        Self {
            timestamp: 0,
            source_id: source_id.into(),
            instance_id: String::new(),
            tags: HashMap::new(),
            deprecated_tags: HashMap::new(),
            payload,
        }
    }

    /// Create a log envelope
    pub fn log(source_id: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self::new(
            source_id,
            Payload::Log(Log {
                payload: payload.into(),
                log_type: LogType::Out,
            }),
        )
    }

    /// Create a counter envelope carrying a delta
    pub fn counter(source_id: impl Into<String>, name: impl Into<String>, delta: u64) -> Self {
        Self::new(
            source_id,
            Payload::Counter(Counter {
                name: name.into(),
                delta,
                total: 0,
            }),
        )
    }

    /// Create a gauge envelope with a single metric
    pub fn gauge(
        source_id: impl Into<String>,
        name: impl Into<String>,
        unit: impl Into<String>,
        value: f64,
    ) -> Self {
        let mut metrics = HashMap::with_capacity(1);
        metrics.insert(
            name.into(),
            GaugeValue {
                unit: unit.into(),
                value,
            },
        );
        Self::new(source_id, Payload::Gauge(Gauge { metrics }))
    }

    /// Set the timestamp
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the instance id
    #[must_use]
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    /// Add a string tag
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add a legacy typed tag
    #[must_use]
    pub fn with_deprecated_tag(mut self, key: impl Into<String>, value: Value) -> Self {
        self.deprecated_tags.insert(key.into(), value);
        self
    }

    /// Get the counter payload, if this is a counter envelope
    #[inline]
    pub fn counter_payload(&self) -> Option<&Counter> {
        match &self.payload {
            Payload::Counter(c) => Some(c),
            _ => None,
        }
    }

    /// Get the counter payload mutably, if this is a counter envelope
    #[inline]
    pub fn counter_payload_mut(&mut self) -> Option<&mut Counter> {
        match &mut self.payload {
            Payload::Counter(c) => Some(c),
            _ => None,
        }
    }

    /// Short name of the payload variant, for logging
    #[inline]
    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }
}

/// Envelope body: exactly one variant is populated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Log(Log),
    Counter(Counter),
    Gauge(Gauge),
}

impl Payload {
    /// Short name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Log(_) => "log",
            Self::Counter(_) => "counter",
            Self::Gauge(_) => "gauge",
        }
    }
}

/// Log line emitted by an application
///
/// `payload` is raw bytes and goes on the wire as a JSON array of numbers,
/// so it costs up to four bytes per payload byte in a frame. Egress splits
/// batches by encoded size to account for it (see `encode_frames`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub payload: Vec<u8>,
    #[serde(default)]
    pub log_type: LogType,
}

/// Stream a log line was written to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    #[default]
    Out,
    Err,
}

/// Monotonic counter sample
///
/// `delta` is the increment reported by the producer. `total` is only
/// authoritative after the counter aggregator has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub delta: u64,
    #[serde(default)]
    pub total: u64,
}

/// Set of point-in-time measurements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gauge {
    pub metrics: HashMap<String, GaugeValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeValue {
    #[serde(default)]
    pub unit: String,
    pub value: f64,
}

/// Legacy typed tag value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Text(String),
    Integer(i64),
    Decimal(f64),
}

impl Value {
    /// Render the value as a tag string
    ///
    /// Integers render in base 10. Decimals use the shortest representation
    /// that round-trips (`0.23` renders as `"0.23"`, `1.0` as `"1"`).
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Decimal(d) => write!(f, "{}", d),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Self::Decimal(d)
    }
}
