//! Endpoint handlers.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::broker::{ClientRequest, CorrelationKey, PollOutcome, RecordSummary};
use crate::http::request::{decode_callback, decode_json, request_id, StatusQuery};
use crate::http::response::{ApiError, WRITE_ONLY_NOTICE};
use crate::http::server::AppState;

/// `GET` on any write-only endpoint.
pub async fn write_only() -> impl IntoResponse {
    (StatusCode::OK, WRITE_ONLY_NOTICE)
}

/// `POST /client/request`: register a request and answer with its key.
pub async fn submit_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: ClientRequest = decode_json(&body)?;

    let key = state.dispatcher.submit(request).inspect_err(|e| {
        tracing::warn!(request_id = %request_id(&headers), error = %e, "Submission rejected");
    })?;

    Ok((StatusCode::ACCEPTED, key.to_string()))
}

/// `POST /client/status`: report what is known about a key.
pub async fn request_status(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<PollOutcome, ApiError> {
    let query: StatusQuery = decode_json(&body)?;
    Ok(state.resolver.poll(&CorrelationKey::new(query.request)))
}

/// `POST /service/in`: downstream callback carrying a result.
pub async fn service_response(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let (key, result) = decode_callback(&headers).inspect_err(|e| {
        tracing::warn!(request_id = %request_id(&headers), error = %e, "Malformed callback");
    })?;

    state.callbacks.complete(&key, result);
    Ok(StatusCode::OK)
}

/// `GET /admin/records`: record counts by state.
pub async fn record_summary(State(state): State<AppState>) -> Json<RecordSummary> {
    Json(state.store.summary())
}
