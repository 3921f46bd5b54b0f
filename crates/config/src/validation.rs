//! Configuration validation
//!
//! Checks values serde cannot: zero sizes, zero intervals, empty names.

use std::time::Duration;

use crate::{Config, DEFAULT_MAX_FRAME_SIZE};
use crate::error::{ConfigError, Result};

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_ingress(config)?;
    validate_bindings(config)?;
    validate_egress(config)?;
    validate_tags(config)?;
    validate_metrics(config)?;
    Ok(())
}

fn non_zero_duration(section: &'static str, field: &'static str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(ConfigError::invalid_value(section, field, "must be greater than zero"));
    }
    Ok(())
}

fn validate_ingress(config: &Config) -> Result<()> {
    let ingress = &config.ingress;
    if ingress.address.is_empty() {
        return Err(ConfigError::missing_field("ingress", "address"));
    }
    if ingress.max_frame_size == 0 {
        return Err(ConfigError::invalid_value(
            "ingress",
            "max_frame_size",
            "must be greater than zero",
        ));
    }
    // Anything larger could be accepted but never forwarded
    if ingress.max_frame_size > DEFAULT_MAX_FRAME_SIZE {
        return Err(ConfigError::invalid_value(
            "ingress",
            "max_frame_size",
            format!("must not exceed {} bytes", DEFAULT_MAX_FRAME_SIZE),
        ));
    }
    if ingress.buffer_size == 0 {
        return Err(ConfigError::invalid_value(
            "ingress",
            "buffer_size",
            "must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_bindings(config: &Config) -> Result<()> {
    let bindings = &config.bindings;
    if bindings.path.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("bindings", "path"));
    }
    if bindings.hostname.is_empty() {
        return Err(ConfigError::missing_field("bindings", "hostname"));
    }
    non_zero_duration("bindings", "poll_interval", bindings.poll_interval)
}

fn validate_egress(config: &Config) -> Result<()> {
    let egress = &config.egress;
    if egress.queue_capacity == 0 {
        return Err(ConfigError::invalid_value(
            "egress",
            "queue_capacity",
            "must be greater than zero",
        ));
    }
    if egress.max_batch_size == 0 {
        return Err(ConfigError::invalid_value(
            "egress",
            "max_batch_size",
            "must be greater than zero",
        ));
    }
    non_zero_duration("egress", "connect_timeout", egress.connect_timeout)?;
    non_zero_duration("egress", "send_timeout", egress.send_timeout)
}

fn validate_tags(config: &Config) -> Result<()> {
    if config.tags.keys().any(String::is_empty) {
        return Err(ConfigError::invalid_value("tags", "name", "tag names must not be empty"));
    }
    Ok(())
}

fn validate_metrics(config: &Config) -> Result<()> {
    if config.metrics.enabled {
        non_zero_duration("metrics", "interval", config.metrics.interval)?;
    }
    Ok(())
}
