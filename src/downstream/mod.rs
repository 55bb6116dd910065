//! Downstream execution subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher (background task)
//!     → DownstreamExecutor::execute(key, descriptor)
//!     → http.rs issues the described call with ID / Worker-Url headers
//!     → remote service answers 202 and works out-of-band
//!     → remote service POSTs /service/in with ID / Status headers
//!     → CallbackReceiver completes the record
//! ```
//!
//! `relay.rs` is a stand-in remote service: it accepts the call, sleeps,
//! then performs the callback.

pub mod http;
pub mod relay;

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

use crate::broker::key::CorrelationKey;
use crate::broker::record::RequestDescriptor;

pub use http::HttpExecutor;

// Header names are matched case-insensitively on the wire; these are the
// normalized forms.

/// Header carrying the correlation key, both outbound and on the callback.
pub const HEADER_CORRELATION_ID: &str = "id";

/// Header carrying the broker's reachable `host:port` for the callback.
pub const HEADER_CALLBACK_ADDR: &str = "worker-url";

/// Header carrying the downstream status code on the callback.
pub const HEADER_STATUS: &str = "status";

/// Path the broker receives callbacks on.
pub const CALLBACK_PATH: &str = "/service/in";

/// Failures of the background downstream call.
#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("invalid target url {url}: {reason}")]
    InvalidTarget { url: String, reason: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("downstream answered {0}, expected 202")]
    UnexpectedStatus(u16),

    #[error("downstream call timed out after {0} seconds")]
    Timeout(u64),
}

pub type ExecuteFuture = Pin<Box<dyn Future<Output = Result<(), DownstreamError>> + Send + 'static>>;

/// Performs the outbound call described by a record.
///
/// A successful return only means the downstream side accepted the work;
/// the actual result arrives later through the callback endpoint.
pub trait DownstreamExecutor: Send + Sync + 'static {
    fn execute(&self, key: CorrelationKey, request: RequestDescriptor) -> ExecuteFuture;
}
