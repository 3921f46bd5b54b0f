//! Check-config command - validate a configuration file and print a summary

use std::path::Path;

use anyhow::Result;
use conduit_config::Config;

/// Load and validate the configuration, printing what the agent would run with
pub fn run(path: Option<&Path>) -> Result<()> {
    let config = super::load_config(path)?;
    println!("{}", summary(&config));
    Ok(())
}

fn summary(config: &Config) -> String {
    let mut tags: Vec<String> = config
        .tags
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    tags.sort();

    format!(
        "configuration OK\n  ingress:  {}\n  bindings: {:?} at {} every {:?}\n  egress:   queue {} / batch {} / send timeout {:?}\n  tags:     {}\n  metrics:  {}",
        config.ingress.bind_address(),
        config.bindings.source,
        config.bindings.path.display(),
        config.bindings.poll_interval,
        config.egress.queue_capacity,
        config.egress.max_batch_size,
        config.egress.send_timeout,
        if tags.is_empty() {
            "(none)".to_string()
        } else {
            tags.join(", ")
        },
        if config.metrics.enabled {
            format!("every {:?} ({:?})", config.metrics.interval, config.metrics.format)
        } else {
            "disabled".to_string()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_summary() {
        let config = Config::from_str(
            "[tags]\nb = \"2\"\na = \"1\"\n\n[metrics]\nenabled = false",
        )
        .unwrap();

        let summary = summary(&config);
        assert!(summary.starts_with("configuration OK"));
        assert!(summary.contains("127.0.0.1:3458"));
        assert!(summary.contains("a=1, b=2"));
        assert!(summary.contains("metrics:  disabled"));
    }
}
