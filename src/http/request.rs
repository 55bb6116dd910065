//! Inbound request decoding.
//!
//! # Responsibilities
//! - Read the request ID stamped by the request-id layer
//! - Decode client bodies (JSON, content type not enforced)
//! - Decode downstream callbacks, which carry their data in headers

use axum::http::{header, HeaderMap};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::broker::{CorrelationKey, HeaderSet, ResultDescriptor};
use crate::downstream::{HEADER_CORRELATION_ID, HEADER_STATUS};
use crate::http::response::ApiError;

/// Header carrying the per-request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID of an inbound request, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Decode a JSON body regardless of the declared content type.
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::MalformedBody(e.to_string()))
}

/// Body of a status poll.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusQuery {
    #[serde(alias = "Request")]
    pub request: String,
}

/// Why a callback could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("invalid status header: {0:?}")]
    InvalidStatus(String),
}

/// Decode a downstream callback.
///
/// The correlation key doubles as the completion identifier and the
/// callback's headers are kept in the result, minus the request ID stamped
/// on arrival by this server.
pub fn decode_callback(headers: &HeaderMap) -> Result<(CorrelationKey, ResultDescriptor), CallbackError> {
    let id = headers
        .get(HEADER_CORRELATION_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(CallbackError::MissingHeader(HEADER_CORRELATION_ID))?;

    let raw_status = headers
        .get(HEADER_STATUS)
        .ok_or(CallbackError::MissingHeader(HEADER_STATUS))?;
    let status = raw_status
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<u16>().ok())
        .ok_or_else(|| CallbackError::InvalidStatus(String::from_utf8_lossy(raw_status.as_bytes()).into_owned()))?;

    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let mut reported = headers.clone();
    reported.remove(X_REQUEST_ID);

    let result = ResultDescriptor {
        id: id.to_string(),
        status,
        headers: HeaderSet::from(&reported),
        content_length,
    };

    Ok((CorrelationKey::new(id), result))
}
