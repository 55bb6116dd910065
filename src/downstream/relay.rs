//! Simulated slow downstream service.
//!
//! Accepts a dispatched call right away, then works for a random number of
//! seconds before calling the broker back with the outcome.

use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::time::Duration;
use tower_http::trace::TraceLayer;

use crate::config::ExecutorConfig;
use crate::downstream::{CALLBACK_PATH, HEADER_CALLBACK_ADDR, HEADER_CORRELATION_ID, HEADER_STATUS};

/// Work order pulled from an inbound dispatched call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub callback_addr: String,
}

impl Job {
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Some(Self {
            id: read(HEADER_CORRELATION_ID)?,
            callback_addr: read(HEADER_CALLBACK_ADDR)?,
        })
    }

    /// Callback URL on the broker.
    pub fn callback_url(&self) -> String {
        format!("http://{}{}", self.callback_addr, CALLBACK_PATH)
    }
}

#[derive(Clone)]
struct RelayState {
    client: reqwest::Client,
    min_delay_secs: u64,
    max_delay_secs: u64,
}

/// Router for the downstream executor service.
pub fn router(config: &ExecutorConfig) -> Result<Router, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.callback_timeout_secs))
        .no_proxy()
        .build()?;

    let state = RelayState {
        client,
        min_delay_secs: config.min_delay_secs,
        max_delay_secs: config.max_delay_secs.max(config.min_delay_secs),
    };

    Ok(Router::new()
        .route("/", any(handle_job))
        .route("/{*path}", any(handle_job))
        .with_state(state)
        .layer(TraceLayer::new_for_http()))
}

async fn handle_job(State(state): State<RelayState>, method: Method, headers: HeaderMap) -> Response {
    if method != Method::GET && method != Method::POST {
        return (StatusCode::METHOD_NOT_ALLOWED, format!("wrong method: {method}")).into_response();
    }

    let Some(job) = Job::from_headers(&headers) else {
        return (StatusCode::BAD_REQUEST, "missing ID or Worker-Url header").into_response();
    };

    let delay = fastrand::u64(state.min_delay_secs..=state.max_delay_secs);
    tracing::info!(id = %job.id, callback = %job.callback_addr, delay_secs = delay, "Job accepted");

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(delay)).await;
        if let Err(e) = send_callback(&state.client, &job, delay).await {
            tracing::error!(id = %job.id, error = %e, "Callback failed");
        }
    });

    StatusCode::ACCEPTED.into_response()
}

/// Report a finished job to the broker.
pub async fn send_callback(client: &reqwest::Client, job: &Job, delay_secs: u64) -> Result<(), reqwest::Error> {
    let response = client
        .post(job.callback_url())
        .header(HEADER_CORRELATION_ID, &job.id)
        .header(HEADER_STATUS, StatusCode::OK.as_u16().to_string())
        .body(format!("sleep: {delay_secs}s"))
        .send()
        .await?
        .error_for_status()?;

    tracing::info!(id = %job.id, status = %response.status(), "Callback delivered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn instant_config() -> ExecutorConfig {
        ExecutorConfig {
            min_delay_secs: 0,
            max_delay_secs: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_job_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("id", "k1".parse().unwrap());
        assert!(Job::from_headers(&headers).is_none());

        headers.insert("worker-url", "127.0.0.1:9080".parse().unwrap());
        let job = Job::from_headers(&headers).unwrap();
        assert_eq!(job.id, "k1");
        assert_eq!(job.callback_url(), "http://127.0.0.1:9080/service/in");
    }

    #[tokio::test]
    async fn test_rejects_other_methods() {
        let router = router(&instant_config()).unwrap();
        let response = router
            .oneshot(Request::delete("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_requires_job_headers() {
        let router = router(&instant_config()).unwrap();
        let response = router
            .oneshot(Request::get("/work").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_accepts_and_calls_back() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let broker = Router::new().route(
            CALLBACK_PATH,
            axum::routing::post(move |headers: HeaderMap, body: String| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send((headers, body));
                    StatusCode::OK
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let broker_addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, broker).await;
        });

        let response = router(&instant_config())
            .unwrap()
            .oneshot(
                Request::get("/anything")
                    .header("ID", "k1")
                    .header("Worker-Url", broker_addr.to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let (headers, body) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("callback should arrive")
            .unwrap();
        assert_eq!(headers.get("id").unwrap(), "k1");
        assert_eq!(headers.get("status").unwrap(), "200");
        assert_eq!(body, "sleep: 0s");
    }
}
