//! Asynchronous request/response correlation broker.
//!
//! Clients submit a request description and immediately get back a
//! correlation key. The broker dispatches the request to a slow downstream
//! service in the background; that service later calls back with the
//! result, and clients poll with their key until it shows up.

pub mod broker;
pub mod config;
pub mod downstream;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use broker::{CorrelationKey, PollOutcome, RecordStore};
pub use config::schema::BrokerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
