//! Conduit - telemetry forwarding agent
//!
//! # Usage
//!
//! ```bash
//! # Run the agent (default)
//! conduit
//! conduit --config /etc/conduit/conduit.toml
//!
//! # Validate a configuration file and exit
//! conduit check-config --config conduit.toml
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use conduit_config::{Config, LogFormat};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Conduit - telemetry forwarding agent
#[derive(Parser, Debug)]
#[command(name = "conduit")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Run the agent
    Serve,

    /// Load and validate the configuration, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::CheckConfig) => cmd::check::run(cli.config.as_deref()),
        // No subcommand = run the agent
        Some(Command::Serve) | None => {
            let config = cmd::load_config(cli.config.as_deref())?;
            let log_level = resolve_log_level(cli.log_level.as_deref(), &config);
            init_logging(&log_level, config.log.format)?;
            cmd::serve::run(config).await
        }
    }
}

/// Resolve log level: CLI flag > config file
///
/// `RUST_LOG`, when set, overrides both in `init_logging`.
fn resolve_log_level(cli_level: Option<&str>, config: &Config) -> String {
    match cli_level {
        Some(level) => level.to_string(),
        None => config.log.level.as_str().to_string(),
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .or_else(|_| EnvFilter::try_new("info"))
            .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?,
    };

    match format {
        LogFormat::Console => tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_current_span(false))
            .with(filter)
            .init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["conduit"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["conduit", "check-config", "--config", "a.toml", "-l", "debug"])
                .unwrap();

        assert_eq!(cli.command, Some(Command::CheckConfig));
        assert_eq!(cli.config.unwrap().to_str(), Some("a.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_log_level_precedence() {
        let config = Config::from_str("[log]\nlevel = \"warn\"").unwrap();

        assert_eq!(resolve_log_level(Some("trace"), &config), "trace");
        assert_eq!(resolve_log_level(None, &config), "warn");
    }
}
