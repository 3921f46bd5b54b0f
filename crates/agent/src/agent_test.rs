//! Agent tests with in-memory connectors and fetchers

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conduit_bindings::{BindingError, BindingFetcher, StaticBindingFetcher};
use conduit_config::Config;
use conduit_metrics::MetricsRegistry;
use conduit_pipeline::{ACTIVE_BINDINGS, Connection, Connector, ConsumerConfig};
use conduit_protocol::{Binding, Envelope, Value};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{AgentError, AgentSettings, BINDING_FETCH_ERRORS, ForwarderAgent, INGRESS, PROCESS_ERRORS};

// ============================================================================
// Helpers
// ============================================================================

type Received = Arc<Mutex<Vec<Arc<Envelope>>>>;

/// Records every envelope delivered to any binding
#[derive(Default)]
struct Recorder {
    received: Received,
}

struct RecordingConnection(Received);

#[async_trait]
impl Connection for RecordingConnection {
    async fn send(&mut self, batch: &[Arc<Envelope>]) -> conduit_pipeline::Result<usize> {
        self.0.lock().extend(batch.iter().cloned());
        Ok(batch.len())
    }
}

#[async_trait]
impl Connector for Recorder {
    async fn connect(&self, _binding: &Binding) -> conduit_pipeline::Result<Box<dyn Connection>> {
        Ok(Box::new(RecordingConnection(Arc::clone(&self.received))))
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

/// Replays scripted fetch results, then repeats the last one
struct ScriptedFetcher {
    script: Mutex<VecDeque<Option<Vec<Binding>>>>,
}

impl ScriptedFetcher {
    fn new(script: Vec<Option<Vec<Binding>>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
        }
    }
}

#[async_trait]
impl BindingFetcher for ScriptedFetcher {
    async fn fetch_bindings(&self) -> conduit_bindings::Result<Vec<Binding>> {
        let mut script = self.script.lock();
        let next = if script.len() > 1 {
            script.pop_front().flatten()
        } else {
            script.front().cloned().flatten()
        };
        next.ok_or_else(|| BindingError::Invalid {
            path: PathBuf::from("bindings.toml"),
            message: "scripted failure".into(),
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn binding(app: &str, port: u16) -> Binding {
    Binding::new(app, "host", format!("tcp://127.0.0.1:{}", port))
}

fn settings(tags: &[(&str, &str)]) -> AgentSettings {
    AgentSettings {
        tags: tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>(),
        consumer: ConsumerConfig::default(),
        poll_interval: Duration::from_secs(3600),
    }
}

fn agent_with(
    settings: AgentSettings,
    fetcher: Arc<dyn BindingFetcher>,
) -> (ForwarderAgent, Received, Arc<MetricsRegistry>) {
    let recorder = Arc::new(Recorder::default());
    let received = Arc::clone(&recorder.received);
    let metrics = Arc::new(MetricsRegistry::new());
    let agent = ForwarderAgent::new(settings, fetcher, recorder, Arc::clone(&metrics)).unwrap();
    (agent, received, metrics)
}

async fn wait_for(received: &Received, count: usize) -> Vec<Arc<Envelope>> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let received = received.lock();
                if received.len() >= count {
                    return received.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for deliveries")
}

// ============================================================================
// Processing
// ============================================================================

#[tokio::test]
async fn test_counter_totals_and_tags_reach_consumers() {
    let fetcher = Arc::new(StaticBindingFetcher::new(vec![binding("app", 1)]));
    let (agent, received, metrics) = agent_with(settings(&[("some-tag", "some-value")]), fetcher);
    agent.refresh().await.unwrap();

    assert_eq!(agent.process(Envelope::counter("some-id", "requests", 20).with_timestamp(1)), 1);
    assert_eq!(agent.process(Envelope::counter("some-id", "requests", 20).with_timestamp(2)), 1);

    let delivered = wait_for(&received, 2).await;
    let totals: Vec<u64> = delivered
        .iter()
        .map(|e| e.counter_payload().unwrap().total)
        .collect();
    assert_eq!(totals, vec![20, 40]);
    assert!(delivered.iter().all(|e| e.tags["some-tag"] == "some-value"));
    assert_eq!(metrics.counter_value(INGRESS, &[]), Some(2));
}

#[tokio::test]
async fn test_tag_precedence_and_deprecated_rendering() {
    let fetcher = Arc::new(StaticBindingFetcher::new(vec![binding("app", 1)]));
    let (agent, received, _metrics) =
        agent_with(settings(&[("a", "static"), ("b", "static")]), fetcher);
    agent.refresh().await.unwrap();

    let envelope = Envelope::log("app", "hello")
        .with_timestamp(1)
        .with_tag("a", "existing")
        .with_deprecated_tag("b", Value::Text("legacy".into()))
        .with_deprecated_tag("code", Value::Integer(502))
        .with_deprecated_tag("ratio", Value::Decimal(0.23));
    agent.process(envelope);

    let delivered = wait_for(&received, 1).await;
    let tags = &delivered[0].tags;
    assert_eq!(tags["a"], "existing");
    assert_eq!(tags["b"], "static");
    assert_eq!(tags["code"], "502");
    assert_eq!(tags["ratio"], "0.23");
}

#[tokio::test]
async fn test_process_without_bindings() {
    let fetcher = Arc::new(StaticBindingFetcher::new(Vec::new()));
    let (agent, _received, metrics) = agent_with(settings(&[]), fetcher);

    assert_eq!(agent.process(Envelope::log("app", "nobody listens").with_timestamp(1)), 0);
    assert_eq!(metrics.counter_value(INGRESS, &[]), Some(1));
    assert_eq!(metrics.counter_value(PROCESS_ERRORS, &[]), Some(0));
}

#[test]
fn test_empty_tag_name_is_rejected() {
    let fetcher = Arc::new(StaticBindingFetcher::new(Vec::new()));
    let err = ForwarderAgent::new(
        settings(&[("", "value")]),
        fetcher,
        Arc::new(Recorder::default()),
        Arc::new(MetricsRegistry::new()),
    )
    .unwrap_err();

    assert!(matches!(err, AgentError::Chain(_)));
}

// ============================================================================
// Refresh
// ============================================================================

#[tokio::test]
async fn test_fetch_error_keeps_previous_bindings() {
    let fetcher = Arc::new(ScriptedFetcher::new(vec![
        Some(vec![binding("a", 1), binding("b", 2)]),
        None,
    ]));
    let (agent, _received, metrics) = agent_with(settings(&[]), fetcher);

    let summary = agent.refresh().await.unwrap();
    assert_eq!(summary.active, 2);

    assert!(agent.refresh().await.is_none());
    assert!(agent.refresh().await.is_none());

    assert_eq!(agent.registry().len(), 2);
    assert_eq!(metrics.gauge_value(ACTIVE_BINDINGS, &[]), Some(2));
    assert_eq!(metrics.counter_value(BINDING_FETCH_ERRORS, &[]), Some(2));
}

#[tokio::test]
async fn test_refresh_follows_binding_changes() {
    let fetcher = Arc::new(StaticBindingFetcher::new(vec![binding("a", 1)]));
    let (agent, _received, metrics) = agent_with(settings(&[]), fetcher.clone());

    agent.refresh().await.unwrap();
    assert_eq!(agent.registry().bindings(), vec![binding("a", 1)]);

    fetcher.set(vec![binding("b", 2), binding("c", 3)]);
    let summary = agent.refresh().await.unwrap();

    assert_eq!(summary.added, 2);
    assert_eq!(summary.removed, 1);
    assert_eq!(agent.registry().bindings(), vec![binding("b", 2), binding("c", 3)]);
    assert_eq!(metrics.gauge_value(ACTIVE_BINDINGS, &[]), Some(2));
}

#[tokio::test]
async fn test_run_refreshes_immediately_and_shuts_down() {
    let fetcher = Arc::new(StaticBindingFetcher::new(vec![binding("a", 1), binding("b", 2)]));
    let (agent, _received, metrics) = agent_with(settings(&[]), fetcher);
    let agent = Arc::new(agent);

    let cancel = CancellationToken::new();
    let task = {
        let agent = Arc::clone(&agent);
        let cancel = cancel.clone();
        tokio::spawn(async move { agent.run(cancel).await })
    };

    // Poll interval is an hour; only the immediate first tick can do this
    tokio::time::timeout(Duration::from_secs(5), async {
        while agent.registry().len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("first refresh did not happen");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("run did not return after cancel")
        .unwrap();

    assert!(agent.registry().is_empty());
    assert_eq!(metrics.gauge_value(ACTIVE_BINDINGS, &[]), Some(0));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_from_config() {
    let config: Config = r#"
        [bindings]
        type = "file"
        path = "/nonexistent/bindings.toml"
        poll_interval = "2s"

        [tags]
        deployment = "test"
    "#
    .parse()
    .unwrap();

    let agent = ForwarderAgent::from_config(&config, Arc::new(MetricsRegistry::new())).unwrap();

    assert_eq!(agent.poll_interval(), Duration::from_secs(2));
    assert_eq!(agent.chain().names(), vec!["tagger", "counter_aggregator"]);
    assert_eq!(agent.registry().config().queue_capacity, 10_000);
}

#[tokio::test]
async fn test_from_config_missing_binding_file_is_empty() {
    let config: Config = r#"
        [bindings]
        type = "file"
        path = "/nonexistent/bindings.toml"
    "#
    .parse()
    .unwrap();

    let agent = ForwarderAgent::from_config(&config, Arc::new(MetricsRegistry::new())).unwrap();
    let summary = agent.refresh().await.unwrap();

    assert_eq!(summary.active, 0);
}

#[test]
fn test_ingress_frame_limit_matches_egress() {
    // Ingress must never accept a frame egress cannot write
    assert_eq!(
        conduit_config::DEFAULT_MAX_FRAME_SIZE,
        conduit_protocol::MAX_FRAME_SIZE
    );
}
