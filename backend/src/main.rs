//! Service entry-point: loads settings, wires the error catalogue and
//! middleware stack, then serves health probes and OpenAPI docs.

mod server;

use std::sync::Arc;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr as _, eyre};
use ortho_config::OrthoConfig as _;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use server::{ServerConfig, create_server};
use template_api::domain::ErrorCatalogue;
use template_api::inbound::http::health::HealthState;
use template_api::middleware::RateLimit;
use template_api::settings::ServerSettings;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load_from_iter(std::env::args_os())
        .map_err(|err| eyre!("failed to load server settings: {err}"))?;
    let config = server_config(&settings)?;

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), config)
        .wrap_err_with(|| format!("failed to bind {}:{}", settings.host(), settings.port()))?;
    info!(host = settings.host(), port = settings.port(), "listening");

    let outcome = server.await;
    health_state.mark_unhealthy();
    outcome.wrap_err("server terminated abnormally")
}

/// Translate loaded settings into a [`ServerConfig`].
fn server_config(settings: &ServerSettings) -> Result<ServerConfig> {
    let catalogue = ErrorCatalogue::load(settings.error_catalogue_path.as_deref())
        .wrap_err("failed to load error catalogue")?;
    info!(codes = catalogue.len(), "error catalogue loaded");

    let rate_limit = if settings.rate_limit_enable {
        RateLimit::new(settings.rate_limit_max(), settings.rate_limit_window())
            .wrap_err("invalid rate limit settings")?
    } else {
        RateLimit::disabled()
    };

    let config = ServerConfig::new(settings.bind_addr()?)
        .with_catalogue(Arc::new(catalogue))
        .with_rate_limit(rate_limit)
        .with_body_log_limit(settings.body_log_limit());

    #[cfg(feature = "metrics")]
    let config = config.with_metrics(server::initialize_metrics());

    Ok(config)
}
