//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the broker
//! and the bundled downstream executor. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BrokerConfig {
    /// Listener configuration (bind address, callback address).
    pub listener: ListenerConfig,

    /// Timeout configuration for inbound requests.
    pub timeouts: TimeoutConfig,

    /// Outbound downstream call settings.
    pub dispatch: DispatchConfig,

    /// Settings for the bundled downstream executor service.
    pub executor: ExecutorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:9080").
    pub bind_address: String,

    /// `host:port` downstream services use to call back.
    /// Falls back to `bind_address` when unset.
    pub advertised_address: Option<String>,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl ListenerConfig {
    /// Address stamped on outbound calls for the callback.
    pub fn callback_address(&self) -> &str {
        self.advertised_address
            .as_deref()
            .unwrap_or(&self.bind_address)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9080".to_string(),
            advertised_address: None,
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Outbound call configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Time allowed for the downstream side to accept the call, in seconds.
    pub call_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            call_timeout_secs: 30,
        }
    }
}

/// Downstream executor service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Bind address for the executor service.
    pub bind_address: String,

    /// Lower bound of the simulated work delay in seconds.
    pub min_delay_secs: u64,

    /// Upper bound (inclusive) of the simulated work delay in seconds.
    pub max_delay_secs: u64,

    /// Timeout for the callback request in seconds.
    pub callback_timeout_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9081".to_string(),
            min_delay_secs: 1,
            max_delay_secs: 14,
            callback_timeout_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
