//! Metrics collection and exposition.
//!
//! # Metrics
//! - `broker_submissions_total` (counter): submissions by outcome
//!   (accepted, rejected, collision)
//! - `broker_dispatch_total` (counter): background calls by outcome
//!   (accepted, failed)
//! - `broker_callbacks_total` (counter): callbacks by outcome
//!   (completed, already_completed, unknown_key)
//! - `broker_polls_total` (counter): polls by observed state
//!   (not_found, pending, completed)
//! - `broker_records` (gauge): records currently tracked
//!
//! Recording is a no-op until a recorder is installed.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics listener started");
    Ok(())
}

pub fn record_submission(outcome: &'static str) {
    ::metrics::counter!("broker_submissions_total", "outcome" => outcome).increment(1);
}

pub fn record_dispatch(outcome: &'static str) {
    ::metrics::counter!("broker_dispatch_total", "outcome" => outcome).increment(1);
}

pub fn record_callback(outcome: &'static str) {
    ::metrics::counter!("broker_callbacks_total", "outcome" => outcome).increment(1);
}

pub fn record_poll(state: &'static str) {
    ::metrics::counter!("broker_polls_total", "state" => state).increment(1);
}

pub fn record_tracked_records(count: usize) {
    ::metrics::gauge!("broker_records").set(count as f64);
}
