//! Broker error types.

use thiserror::Error;

use crate::broker::key::CorrelationKey;

/// Client input rejected before any record is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("bad url")]
    EmptyUrl,

    #[error("not allowed http method: {0}")]
    MethodNotAllowed(String),

    #[error("not set headers")]
    NoHeaders,
}

/// Errors raised by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The generator handed out a key that is already tracked.
    #[error("correlation key {0} is already tracked")]
    DuplicateKey(CorrelationKey),
}

/// Why a submission produced no correlation key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("key collision: {0}")]
    KeyCollision(CorrelationKey),
}

impl From<StoreError> for SubmitError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(key) => SubmitError::KeyCollision(key),
        }
    }
}
