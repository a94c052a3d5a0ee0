//! Server construction and middleware wiring.

mod config;
#[cfg(feature = "metrics")]
mod metrics;

pub use config::ServerConfig;

#[cfg(feature = "metrics")]
pub(crate) use metrics::initialize_metrics;
#[cfg(feature = "metrics")]
use metrics::MetricsLayer;

use actix_web::body::MessageBody;
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use template_api::Trace;
#[cfg(debug_assertions)]
use template_api::doc::ApiDoc;
use template_api::inbound::http::fallback::forbidden;
use template_api::inbound::http::health::{HealthState, health, live, ready};
use template_api::inbound::http::{ResponseAdapter, json_config};
use template_api::middleware::{ContentTypeGuard, RateLimit, RequestLog, Tenant};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    adapter: web::Data<ResponseAdapter>,
    rate_limit: RateLimit,
    body_log_limit: usize,
}

/// Assemble routes and the middleware stack.
///
/// Layers run outermost first: trace stamping, tenant echo, access log, the
/// media type guard, then rate limiting closest to the handlers. Unrouted
/// paths answer 403.
fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        adapter,
        rate_limit,
        body_log_limit,
    } = deps;

    let app = App::new()
        .app_data(health_state)
        .app_data(adapter)
        .app_data(json_config())
        .wrap(rate_limit)
        .wrap(ContentTypeGuard::json_posts())
        .wrap(RequestLog::new(body_log_limit))
        .wrap(Tenant)
        .wrap(Trace)
        .service(health)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app.default_service(web::to(forbidden))
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Parameters
/// - `health_state`: shared readiness state updated once the server is initialised.
/// - `config`: pre-built [`ServerConfig`] carrying the bind address, error
///   catalogue, rate limit, and optional metrics settings.
///
/// # Returns
/// A spawned [`Server`] that must be awaited to drive the listener.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket or starting the server fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let ServerConfig {
        bind_addr,
        catalogue,
        rate_limit,
        body_log_limit,
        #[cfg(feature = "metrics")]
        prometheus,
    } = config;
    let adapter = web::Data::new(
        catalogue.map_or_else(ResponseAdapter::default, ResponseAdapter::with_catalogue),
    );

    #[cfg(feature = "metrics")]
    let metrics_layer = MetricsLayer::from_option(prometheus);

    let server = HttpServer::new(move || {
        let app = build_app(AppDependencies {
            health_state: server_health_state.clone(),
            adapter: adapter.clone(),
            rate_limit: rate_limit.clone(),
            body_log_limit,
        });

        #[cfg(feature = "metrics")]
        let app = app.wrap(metrics_layer.clone());

        app
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
