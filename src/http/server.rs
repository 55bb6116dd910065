//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the client, callback and admin endpoints
//! - Wire up middleware (request ID, tracing, panic boundary, limits)
//! - Own the record store shared by every handler
//! - Drain dispatch reports in the background

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::broker::dispatcher::log_dispatch_reports;
use crate::broker::{CallbackReceiver, DispatchReport, Dispatcher, RecordStore, StatusResolver};
use crate::config::BrokerConfig;
use crate::downstream::{DownstreamExecutor, HttpExecutor, CALLBACK_PATH};
use crate::http::handlers::{record_summary, request_status, service_response, submit_request, write_only};
use crate::http::response::handle_panic;
use crate::lifecycle::shutdown::wait_for;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
    pub dispatcher: Dispatcher,
    pub callbacks: CallbackReceiver,
    pub resolver: StatusResolver,
}

impl AppState {
    /// Wire the broker components around one shared store.
    pub fn new(
        store: RecordStore,
        executor: Arc<dyn DownstreamExecutor>,
    ) -> (Self, mpsc::UnboundedReceiver<DispatchReport>) {
        let (dispatcher, reports) = Dispatcher::new(store.clone(), executor);
        let state = Self {
            callbacks: CallbackReceiver::new(store.clone()),
            resolver: StatusResolver::new(store.clone()),
            dispatcher,
            store,
        };
        (state, reports)
    }
}

/// HTTP server for the broker.
pub struct HttpServer {
    router: Router,
    config: BrokerConfig,
    store: RecordStore,
    reports: mpsc::UnboundedReceiver<DispatchReport>,
}

impl HttpServer {
    /// Create a server that dispatches over HTTP, advertising the
    /// configured callback address.
    pub fn new(config: BrokerConfig) -> Self {
        let executor = Arc::new(HttpExecutor::new(
            config.listener.callback_address(),
            &config.dispatch,
        ));
        Self::with_executor(config, executor)
    }

    /// Create a server with a custom downstream executor.
    pub fn with_executor(config: BrokerConfig, executor: Arc<dyn DownstreamExecutor>) -> Self {
        let store = RecordStore::new();
        let (state, reports) = AppState::new(store.clone(), executor);
        let router = Self::build_router(&config, state);

        Self {
            router,
            config,
            store,
            reports,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &BrokerConfig, state: AppState) -> Router {
        Router::new()
            .route("/client/request", post(submit_request).get(write_only))
            .route("/client/status", post(request_status).get(write_only))
            .route(CALLBACK_PATH, post(service_response).get(write_only))
            .route("/admin/records", get(record_summary))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TraceLayer::new_for_http())
                    .layer(CatchPanicLayer::custom(handle_panic)),
            )
    }

    /// Router with all layers, for serving or driving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            callback_address = %self.config.listener.callback_address(),
            "Broker HTTP server starting"
        );

        tokio::spawn(log_dispatch_reports(self.reports));

        axum::serve(listener, self.router)
            .with_graceful_shutdown(wait_for(shutdown))
            .await?;

        tracing::info!("Broker HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{CorrelationKey, HeaderSet, RequestDescriptor, ResultDescriptor};
    use crate::downstream::{DownstreamError, ExecuteFuture};
    use crate::http::response::{NOT_REGISTERED, STILL_PENDING, WRITE_ONLY_NOTICE};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    struct AcceptAll;

    impl DownstreamExecutor for AcceptAll {
        fn execute(&self, _key: CorrelationKey, _request: RequestDescriptor) -> ExecuteFuture {
            Box::pin(async { Ok::<(), DownstreamError>(()) })
        }
    }

    struct Explodes;

    impl DownstreamExecutor for Explodes {
        fn execute(&self, _key: CorrelationKey, _request: RequestDescriptor) -> ExecuteFuture {
            panic!("executor exploded");
        }
    }

    fn server() -> HttpServer {
        HttpServer::with_executor(BrokerConfig::default(), Arc::new(AcceptAll))
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri).body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_submit_then_poll_pending() {
        let server = server();
        let router = server.router();

        let (status, key) = send(
            &router,
            post("/client/request", r#"{"method":"GET","url":"http://x/y","headers":{"A":"1"}}"#),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(server.store().get(&CorrelationKey::new(key.clone())).is_some());

        let (status, body) = send(&router, post("/client/status", &format!(r#"{{"request":"{key}"}}"#))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body, STILL_PENDING);
    }

    #[tokio::test]
    async fn test_callback_completes_record() {
        let server = server();
        let router = server.router();

        let (_, key) = send(
            &router,
            post("/client/request", r#"{"method":"POST","url":"http://x/y","headers":{"A":["1"]}}"#),
        )
        .await;

        let callback = Request::post("/service/in")
            .header("ID", key.as_str())
            .header("Status", "200")
            .body(Body::from("sleep: 3s"))
            .unwrap();
        let (status, _) = send(&router, callback).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&router, post("/client/status", &format!(r#"{{"request":"{key}"}}"#))).await;
        assert_eq!(status, StatusCode::OK);
        let result: ResultDescriptor = serde_json::from_str(&body).unwrap();
        assert_eq!(result.id, key);
        assert_eq!(result.status, 200);
        assert_eq!(
            result.headers,
            HeaderSet::new().with("id", key.as_str()).with("status", "200")
        );
    }

    #[tokio::test]
    async fn test_rejections() {
        let router = server().router();

        let (status, body) = send(
            &router,
            post("/client/request", r#"{"method":"DELETE","url":"http://x/y","headers":{"A":"1"}}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("DELETE"));

        let (status, _) = send(&router, post("/client/request", "not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&router, post("/client/status", r#"{"request":"nonexistent-key"}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, NOT_REGISTERED);

        let (status, _) = send(&router, post("/service/in", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_callback_is_accepted() {
        let server = server();
        let callback = Request::post("/service/in")
            .header("ID", "never-issued")
            .header("Status", "200")
            .body(Body::empty())
            .unwrap();

        let (status, _) = send(&server.router(), callback).await;
        assert_eq!(status, StatusCode::OK);
        assert!(server.store().is_empty());
    }

    #[tokio::test]
    async fn test_get_is_write_only() {
        let server = server();
        for uri in ["/client/request", "/client/status", "/service/in"] {
            let (status, body) = send(&server.router(), Request::get(uri).body(Body::empty()).unwrap()).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, WRITE_ONLY_NOTICE);
        }
        assert!(server.store().is_empty());
    }

    #[tokio::test]
    async fn test_request_id_is_propagated() {
        let response = server()
            .router()
            .oneshot(Request::get("/admin/records").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_executor_panic_keeps_key_pollable() {
        let server = HttpServer::with_executor(BrokerConfig::default(), Arc::new(Explodes));
        let router = server.router();

        let (status, key) = send(
            &router,
            post("/client/request", r#"{"method":"GET","url":"http://x/y","headers":{"A":"1"}}"#),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, body) = send(&router, post("/client/status", &format!(r#"{{"request":"{key}"}}"#))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body, STILL_PENDING);

        let (status, body) = send(&router, Request::get("/admin/records").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"total\":1"));
    }
}
