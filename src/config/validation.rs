//! Configuration validation.
//!
//! Semantic checks only; serde handles syntax. Every problem is reported,
//! not just the first.

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::BrokerConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &BrokerConfig) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    match config.listener.bind_address.parse::<SocketAddr>() {
        Ok(addr) => {
            if addr.ip().is_unspecified() && config.listener.advertised_address.is_none() {
                issues.push(ValidationIssue::new(
                    "listener.advertised_address",
                    "required when binding an unspecified address",
                ));
            }
        }
        Err(e) => issues.push(ValidationIssue::new("listener.bind_address", e.to_string())),
    }

    if let Some(advertised) = &config.listener.advertised_address {
        if advertised.trim().is_empty() || advertised.contains('/') {
            issues.push(ValidationIssue::new(
                "listener.advertised_address",
                "must be a bare host:port",
            ));
        }
    }

    if config.listener.max_body_bytes == 0 {
        issues.push(ValidationIssue::new("listener.max_body_bytes", "must be greater than 0"));
    }

    if config.timeouts.request_secs == 0 {
        issues.push(ValidationIssue::new("timeouts.request_secs", "must be greater than 0"));
    }

    if config.dispatch.connect_timeout_secs == 0 {
        issues.push(ValidationIssue::new(
            "dispatch.connect_timeout_secs",
            "must be greater than 0",
        ));
    }

    if config.dispatch.call_timeout_secs == 0 {
        issues.push(ValidationIssue::new("dispatch.call_timeout_secs", "must be greater than 0"));
    }

    if config.executor.bind_address.parse::<SocketAddr>().is_err() {
        issues.push(ValidationIssue::new("executor.bind_address", "not a socket address"));
    }

    if config.executor.min_delay_secs > config.executor.max_delay_secs {
        issues.push(ValidationIssue::new(
            "executor.min_delay_secs",
            format!(
                "{} exceeds max_delay_secs {}",
                config.executor.min_delay_secs, config.executor.max_delay_secs
            ),
        ));
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        issues.push(ValidationIssue::new(
            "observability.log_level",
            format!("unknown level {:?}", config.observability.log_level),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        issues.push(ValidationIssue::new(
            "observability.metrics_address",
            "not a socket address",
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
