//! Reqwest-backed adapter for the [`HttpRequester`] port.
//!
//! This adapter owns transport details only: URL joining, default and trace
//! headers, pooling and timeout configuration, and mapping non-success
//! statuses onto [`Failure::ExternalIntegration`].

mod settings;

pub use settings::RequesterSettings;

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::json;
use tracing::debug;

use crate::domain::ports::{HttpRequester, IntegrationResponse};
use crate::domain::{ExternalIntegrationError, Failure, TraceId, TRACE_ID_HEADER};

/// JSON requester bound to one downstream base URL.
///
/// Every request carries `Content-Type: application/json`, the configured
/// default headers, and the ambient trace identifier.
#[derive(Debug, Clone)]
pub struct ReqwestRequester {
    client: Client,
    base_url: String,
    headers: HeaderMap,
    trace_enable: bool,
}

impl ReqwestRequester {
    /// Build a requester for `base_url` using pool and TLS `settings`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        settings: &RequesterSettings,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .pool_max_idle_per_host(settings.max_idle_conns_per_host())
            .pool_idle_timeout(settings.idle_conn_timeout())
            .timeout(settings.idle_conn_timeout())
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            headers: HeaderMap::new(),
            trace_enable: settings.trace_enable,
        })
    }

    /// Replace the default headers sent with every request.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Base URL endpoints are appended to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Vec<u8>>,
    ) -> Result<IntegrationResponse, Failure> {
        let url = join_url(&self.base_url, endpoint);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(trace_header) = trace_header() {
            request = request.header(trace_header.0, trace_header.1);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let started = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|error| transport_failure(&method, &url, error))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| transport_failure(&method, &url, error))?;

        if self.trace_enable {
            debug!(
                method = %method,
                url = %url,
                status = status.as_u16(),
                elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                "outbound request completed"
            );
        }

        if !status.is_success() {
            return Err(status_failure(&method, &url, status, bytes.to_vec()));
        }
        Ok(IntegrationResponse {
            status: status.as_u16(),
            body: bytes.to_vec(),
        })
    }
}

#[async_trait]
impl HttpRequester for ReqwestRequester {
    async fn get(&self, endpoint: &str) -> Result<IntegrationResponse, Failure> {
        self.execute(Method::GET, endpoint, None).await
    }

    async fn post(&self, endpoint: &str, body: Vec<u8>) -> Result<IntegrationResponse, Failure> {
        self.execute(Method::POST, endpoint, Some(body)).await
    }

    async fn put(&self, endpoint: &str, body: Vec<u8>) -> Result<IntegrationResponse, Failure> {
        self.execute(Method::PUT, endpoint, Some(body)).await
    }

    async fn delete(&self, endpoint: &str) -> Result<IntegrationResponse, Failure> {
        self.execute(Method::DELETE, endpoint, None).await
    }
}

fn join_url(base_url: &str, endpoint: &str) -> String {
    format!("{base_url}{endpoint}")
}

fn trace_header() -> Option<(HeaderName, HeaderValue)> {
    let trace_id = TraceId::current()?;
    let value = HeaderValue::from_str(trace_id.as_str()).ok()?;
    let name = HeaderName::from_bytes(TRACE_ID_HEADER.as_bytes()).ok()?;
    Some((name, value))
}

fn transport_failure(method: &Method, url: &str, error: reqwest::Error) -> Failure {
    ExternalIntegrationError::transport(error)
        .with_metadata("method", json!(method.as_str()))
        .with_metadata("url", json!(url))
        .into()
}

fn status_failure(method: &Method, url: &str, status: StatusCode, body: Vec<u8>) -> Failure {
    ExternalIntegrationError::new(status.as_u16(), body)
        .with_metadata("method", json!(method.as_str()))
        .with_metadata("url", json!(url))
        .into()
}
