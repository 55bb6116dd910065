//! Shared helpers for integration tests.

#![allow(dead_code)]

use correlation_broker::config::{BrokerConfig, ExecutorConfig};
use correlation_broker::downstream::relay;
use correlation_broker::{HttpServer, RecordStore, Shutdown};
use serde_json::Value;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A broker running on an ephemeral port.
pub struct TestBroker {
    pub addr: SocketAddr,
    pub store: RecordStore,
    pub shutdown: Shutdown,
}

impl TestBroker {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestBroker {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a broker whose callback address is its real listening address.
pub async fn start_broker() -> TestBroker {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = BrokerConfig::default();
    config.listener.bind_address = addr.to_string();
    config.listener.advertised_address = Some(addr.to_string());
    config.dispatch.call_timeout_secs = 5;

    let server = HttpServer::new(config);
    let store = server.store().clone();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestBroker { addr, store, shutdown }
}

/// Start the bundled downstream executor with a fixed delay.
pub async fn start_executor(delay_secs: u64) -> SocketAddr {
    let config = ExecutorConfig {
        min_delay_secs: delay_secs,
        max_delay_secs: delay_secs,
        ..Default::default()
    };
    let app = relay::router(&config).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a programmable raw-TCP downstream that answers every request with
/// the status produced by `f`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = u16> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        // Requests carry no body; one read covers the head.
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let status_line = match f().await {
                            202 => "202 Accepted",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                            status_line
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// POST /client/request with a raw JSON body.
pub async fn submit(client: &reqwest::Client, broker: &TestBroker, body: Value) -> (u16, String) {
    let res = client
        .post(broker.url("/client/request"))
        .json(&body)
        .send()
        .await
        .expect("broker unreachable");
    let status = res.status().as_u16();
    (status, res.text().await.unwrap())
}

/// POST /client/status for `key`.
pub async fn poll(client: &reqwest::Client, broker: &TestBroker, key: &str) -> (u16, String) {
    let res = client
        .post(broker.url("/client/status"))
        .json(&serde_json::json!({ "request": key }))
        .send()
        .await
        .expect("broker unreachable");
    let status = res.status().as_u16();
    (status, res.text().await.unwrap())
}

/// Poll until the key leaves the pending state or `timeout` passes.
pub async fn poll_until_done(
    client: &reqwest::Client,
    broker: &TestBroker,
    key: &str,
    timeout: Duration,
) -> (u16, String) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let (status, body) = poll(client, broker, key).await;
        if status != 202 || tokio::time::Instant::now() >= deadline {
            return (status, body);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
