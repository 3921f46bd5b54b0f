//! Serve command - run the forwarder agent

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use conduit_agent::{ForwarderAgent, source_config};
use conduit_config::Config;
use conduit_metrics::{MetricsRegistry, MetricsReporter};
use conduit_sources::TcpSource;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How long each component gets to stop after the shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the agent until SIGINT or SIGTERM
pub async fn run(config: Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        "conduit starting"
    );

    let metrics = Arc::new(MetricsRegistry::new());
    let agent = Arc::new(
        ForwarderAgent::from_config(&config, Arc::clone(&metrics))
            .context("failed to build forwarder agent")?,
    );

    // Coordinated shutdown for every task
    let cancel = CancellationToken::new();

    let mut source = TcpSource::new(source_config(&config.ingress), agent.clone());
    let ingress_addr = source
        .bind()
        .await
        .context("failed to bind ingress listener")?;

    let source_task = {
        let cancel = cancel.child_token();
        tokio::spawn(async move {
            if let Err(e) = source.run(cancel).await {
                error!(error = %e, "ingress source failed");
            }
        })
    };

    let agent_task = {
        let agent = Arc::clone(&agent);
        let cancel = cancel.child_token();
        tokio::spawn(async move { agent.run(cancel).await })
    };

    let reporter_task = {
        let reporter = MetricsReporter::new(config.metrics.clone(), Arc::clone(&metrics));
        tokio::spawn(reporter.run(cancel.child_token()))
    };

    info!(
        ingress = %ingress_addr,
        bindings = ?config.bindings.source,
        bindings_path = %config.bindings.path.display(),
        tags = config.tags.len(),
        "conduit running"
    );

    wait_for_shutdown().await?;

    info!("shutdown signal received, stopping...");
    cancel.cancel();

    // Stop ingress first so nothing new reaches the registry while it drains
    join("ingress source", source_task).await;
    join("binding refresh", agent_task).await;
    join("metrics reporter", reporter_task).await;

    info!("conduit shutdown complete");
    Ok(())
}

async fn join(name: &str, task: JoinHandle<()>) {
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(task = name, error = %e, "task panicked during shutdown"),
        Err(_) => warn!(task = name, "task did not finish within timeout"),
    }
}

/// Wait for SIGINT or SIGTERM
async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("failed to install SIGTERM handler")?;

        tokio::select! {
            result = signal::ctrl_c() => result.context("failed to listen for Ctrl+C")?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    Ok(())
}
