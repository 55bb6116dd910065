//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and gauges via `metrics`)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Correlation keys are attached to every broker log event as `key`
//! - Request IDs flow through tower-http's trace spans
//! - Metrics are cheap (atomic increments) and free when disabled

pub mod logging;
pub mod metrics;
