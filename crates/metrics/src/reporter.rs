//! Periodic metrics reporter
//!
//! Snapshots a [`MetricsRegistry`] at the configured interval and logs the
//! formatted report via tracing.

use std::sync::Arc;

use conduit_config::{MetricsConfig, MetricsFormat};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{HumanFormatter, JsonFormatter, MetricsFormatter, MetricsRegistry, MetricsSnapshot};

/// Logs registry snapshots until cancelled
pub struct MetricsReporter {
    config: MetricsConfig,
    registry: Arc<MetricsRegistry>,
    formatter: Box<dyn MetricsFormatter>,
    previous: Option<MetricsSnapshot>,
}

impl MetricsReporter {
    pub fn new(config: MetricsConfig, registry: Arc<MetricsRegistry>) -> Self {
        let formatter: Box<dyn MetricsFormatter> = match config.format {
            MetricsFormat::Human => Box::new(HumanFormatter::new()),
            MetricsFormat::Json => Box::new(JsonFormatter::new()),
        };

        Self {
            config,
            registry,
            formatter,
            previous: None,
        }
    }

    /// Run the reporter until cancellation
    ///
    /// Spawn this as a tokio task.
    pub async fn run(mut self, cancel: CancellationToken) {
        if !self.config.enabled {
            info!("metrics reporting disabled");
            return;
        }

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick fires immediately; nothing has happened yet
        ticker.tick().await;

        info!(
            interval_secs = self.config.interval.as_secs(),
            format = ?self.config.format,
            "metrics reporter started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    for line in self.render().lines() {
                        info!("{}", line);
                    }
                }
            }
        }
    }

    /// Snapshot and format once, remembering the snapshot for the next delta
    fn render(&mut self) -> String {
        let current = self.registry.snapshot();
        let output = self.formatter.format(&current, self.previous.as_ref());
        self.previous = Some(current);
        output
    }
}
