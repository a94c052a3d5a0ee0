//! HTTP server configuration loaded via OrthoConfig.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::middleware::request_log::DEFAULT_BODY_LOG_LIMIT;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_RATE_LIMIT_MAX: u32 = 100;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Invalid combinations of settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// Host and port do not form a socket address.
    #[error("invalid bind address {address}")]
    BindAddress {
        /// The rejected `host:port` text.
        address: String,
    },
}

/// Listener, rate limiting, and diagnostics settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "HTTP")]
pub struct ServerSettings {
    /// Interface to bind.
    pub host: Option<String>,
    /// Port to bind.
    pub port: Option<u16>,
    /// Enable the per-peer rate limiter.
    #[ortho_config(default = false)]
    pub rate_limit_enable: bool,
    /// Requests admitted per window.
    pub rate_limit_max: Option<u32>,
    /// Window length in seconds.
    pub rate_limit_expiration: Option<u64>,
    /// Error catalogue to load instead of the bundled definitions.
    pub error_catalogue_path: Option<PathBuf>,
    /// Largest request body captured by the access log.
    pub body_log_limit: Option<usize>,
}

impl ServerSettings {
    /// Interface to bind, falling back to all interfaces.
    #[must_use]
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    /// Port to bind, falling back to 8080.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Socket address formed from [`Self::host`] and [`Self::port`].
    ///
    /// # Errors
    /// Returns [`SettingsError::BindAddress`] when the host is not an IP
    /// literal.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let address = format!("{}:{}", self.host(), self.port());
        address
            .parse()
            .map_err(|_| SettingsError::BindAddress { address })
    }

    /// Requests admitted per window.
    #[must_use]
    pub fn rate_limit_max(&self) -> u32 {
        self.rate_limit_max.unwrap_or(DEFAULT_RATE_LIMIT_MAX)
    }

    /// Rate limit window.
    #[must_use]
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(
            self.rate_limit_expiration
                .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        )
    }

    /// Largest request body captured by the access log.
    #[must_use]
    pub fn body_log_limit(&self) -> usize {
        self.body_log_limit.unwrap_or(DEFAULT_BODY_LOG_LIMIT)
    }
}
