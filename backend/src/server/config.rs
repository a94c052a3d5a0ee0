//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;

use template_api::domain::ErrorCatalogue;
use template_api::middleware::RateLimit;
use template_api::middleware::request_log::DEFAULT_BODY_LOG_LIMIT;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) catalogue: Option<Arc<ErrorCatalogue>>,
    pub(crate) rate_limit: RateLimit,
    pub(crate) body_log_limit: usize,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("catalogue", &self.catalogue.as_ref().map(|catalogue| catalogue.len()))
            .field("rate_limit", &self.rate_limit)
            .field("body_log_limit", &self.body_log_limit)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    /// Construct a server configuration bound to `bind_addr` with rate
    /// limiting off and the default body log limit.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            catalogue: None,
            rate_limit: RateLimit::disabled(),
            body_log_limit: DEFAULT_BODY_LOG_LIMIT,
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    /// Resolve repository failures through `catalogue`.
    #[must_use]
    pub fn with_catalogue(mut self, catalogue: Arc<ErrorCatalogue>) -> Self {
        self.catalogue = Some(catalogue);
        self
    }

    /// Replace the rate limiting layer.
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Cap the request body size captured by the access log.
    #[must_use]
    pub const fn with_body_log_limit(mut self, limit: usize) -> Self {
        self.body_log_limit = limit;
        self
    }

    /// Return the socket address the server will bind to.
    #[cfg_attr(
        not(any(test, doctest)),
        expect(
            dead_code,
            reason = "Exercised by unit tests; retained for fixture access"
        )
    )]
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    #[cfg(feature = "metrics")]
    /// Attach Prometheus middleware to the configuration.
    #[must_use]
    pub fn with_metrics(mut self, prometheus: Option<PrometheusMetrics>) -> Self {
        self.prometheus = prometheus;
        self
    }
}
