//! Response mapping.
//!
//! # Responsibilities
//! - Map broker errors to HTTP status codes
//! - Render poll outcomes
//! - Turn handler panics into a generic 500

use axum::{
    body::Body,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::any::Any;
use thiserror::Error;

use crate::broker::{PollOutcome, SubmitError};
use crate::http::request::CallbackError;

/// Answer to any `GET` on a write-only endpoint.
pub const WRITE_ONLY_NOTICE: &str = "I'm ready to POST only";

/// Poll body for an unknown key.
pub const NOT_REGISTERED: &str = "request isn't registered";

/// Poll body for a pending record.
pub const STILL_PENDING: &str = "continue waiting response";

/// Errors a handler reports to its caller.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error("malformed body: {0}")]
    MalformedBody(String),

    #[error(transparent)]
    Callback(#[from] CallbackError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Submit(SubmitError::Validation(e)) => {
                (StatusCode::BAD_REQUEST, e.to_string()).into_response()
            }
            ApiError::Submit(SubmitError::KeyCollision(key)) => {
                tracing::error!(key = %key, "Correlation key collision");
                (StatusCode::INTERNAL_SERVER_ERROR, "error").into_response()
            }
            ApiError::MalformedBody(e) => (StatusCode::BAD_REQUEST, e).into_response(),
            ApiError::Callback(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        }
    }
}

impl IntoResponse for PollOutcome {
    fn into_response(self) -> Response {
        match self {
            PollOutcome::NotFound => (StatusCode::NOT_FOUND, NOT_REGISTERED).into_response(),
            PollOutcome::Pending => (StatusCode::ACCEPTED, STILL_PENDING).into_response(),
            PollOutcome::Completed(result) => (StatusCode::OK, Json(result)).into_response(),
        }
    }
}

/// Response for a panic caught at the request boundary.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic"
    };

    tracing::error!(panic = %detail, "Handler panicked");
    (StatusCode::INTERNAL_SERVER_ERROR, "accident").into_response()
}
