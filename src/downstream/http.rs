//! Outbound HTTP executor.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Method, Request, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;
use tokio::time;
use url::Url;

use crate::broker::key::CorrelationKey;
use crate::broker::record::RequestDescriptor;
use crate::config::DispatchConfig;
use crate::downstream::{
    DownstreamError, DownstreamExecutor, ExecuteFuture, HEADER_CALLBACK_ADDR, HEADER_CORRELATION_ID,
};

/// Issues the described request and stamps it with the correlation key and
/// the broker's callback address.
#[derive(Clone)]
pub struct HttpExecutor {
    client: Client<HttpConnector, Body>,
    callback_addr: String,
    call_timeout: Duration,
}

impl HttpExecutor {
    /// `callback_addr` is the `host:port` the downstream side should call back.
    pub fn new(callback_addr: impl Into<String>, config: &DispatchConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            callback_addr: callback_addr.into(),
            call_timeout: Duration::from_secs(config.call_timeout_secs),
        }
    }

    pub fn callback_addr(&self) -> &str {
        &self.callback_addr
    }

    fn build_request(
        &self,
        key: &CorrelationKey,
        descriptor: &RequestDescriptor,
    ) -> Result<Request<Body>, DownstreamError> {
        let invalid = |reason: String| DownstreamError::InvalidTarget {
            url: descriptor.url.clone(),
            reason,
        };

        let url = Url::parse(&descriptor.url).map_err(|e| invalid(e.to_string()))?;
        if url.scheme() != "http" {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }

        let mut builder = Request::builder()
            .method(Method::from(descriptor.method))
            .uri(url.as_str());

        if let Some(headers) = builder.headers_mut() {
            for (name, value) in descriptor.headers.iter() {
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| invalid(format!("header {name}: {e}")))?;
                let value = HeaderValue::from_str(value)
                    .map_err(|e| invalid(format!("header {name}: {e}")))?;
                headers.append(name, value);
            }

            let id = HeaderValue::from_str(key.as_str())
                .map_err(|e| invalid(format!("correlation key: {e}")))?;
            let callback = HeaderValue::from_str(&self.callback_addr)
                .map_err(|e| invalid(format!("callback address: {e}")))?;
            headers.insert(HEADER_CORRELATION_ID, id);
            headers.insert(HEADER_CALLBACK_ADDR, callback);
        }

        builder
            .body(Body::empty())
            .map_err(|e| invalid(e.to_string()))
    }
}

impl DownstreamExecutor for HttpExecutor {
    fn execute(&self, key: CorrelationKey, descriptor: RequestDescriptor) -> ExecuteFuture {
        let this = self.clone();
        Box::pin(async move {
            let request = this.build_request(&key, &descriptor)?;

            tracing::debug!(
                key = %key,
                method = %descriptor.method,
                url = %descriptor.url,
                "Calling downstream"
            );

            let response = match time::timeout(this.call_timeout, this.client.request(request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => return Err(DownstreamError::Request(e.to_string())),
                Err(_) => return Err(DownstreamError::Timeout(this.call_timeout.as_secs())),
            };

            let status = response.status();
            if status != StatusCode::ACCEPTED {
                return Err(DownstreamError::UnexpectedStatus(status.as_u16()));
            }

            Ok(())
        })
    }
}
