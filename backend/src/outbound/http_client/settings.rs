//! Outbound HTTP client configuration loaded via OrthoConfig.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_MAX_IDLE_CONNS_PER_HOST: usize = 1000;
const DEFAULT_IDLE_CONN_TIMEOUT_SECS: u64 = 3600;

/// Pool, timeout, and TLS settings for [`super::ReqwestRequester`].
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "REQ")]
pub struct RequesterSettings {
    /// Skip TLS certificate verification. Intended for local development.
    #[ortho_config(default = false)]
    pub accept_invalid_certs: bool,
    /// Log per-request timings at debug level.
    #[ortho_config(default = false)]
    pub trace_enable: bool,
    /// Idle connections kept per host.
    pub max_idle_conns_per_host: Option<usize>,
    /// Seconds an idle connection is kept; also the overall request timeout.
    pub idle_conn_timeout: Option<u64>,
}

impl Default for RequesterSettings {
    fn default() -> Self {
        Self {
            accept_invalid_certs: false,
            trace_enable: false,
            max_idle_conns_per_host: None,
            idle_conn_timeout: None,
        }
    }
}

impl RequesterSettings {
    /// Idle connections kept per host, falling back to the default.
    #[must_use]
    pub fn max_idle_conns_per_host(&self) -> usize {
        self.max_idle_conns_per_host
            .unwrap_or(DEFAULT_MAX_IDLE_CONNS_PER_HOST)
    }

    /// Idle timeout, falling back to the default.
    #[must_use]
    pub fn idle_conn_timeout(&self) -> Duration {
        Duration::from_secs(
            self.idle_conn_timeout
                .unwrap_or(DEFAULT_IDLE_CONN_TIMEOUT_SECS),
        )
    }
}
