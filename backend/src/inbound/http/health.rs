//! Health endpoints: liveness and readiness probes for orchestration and load
//! balancers. Documented in OpenAPI via Utoipa.

use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{get, http::header, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

/// Header Kubernetes-style probes use to say which check they want.
pub const PROBE_HEADER: &str = "X-Kubernetes-Probe";

/// Path excluded from request tracing and logging.
pub const HEALTH_PATH: &str = "/health";

/// Shared health state for readiness and liveness checks.
/// Track readiness and whether the process should report itself as alive to
/// orchestrators.
#[derive(Debug)]
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
        }
    }
}

impl HealthState {
    /// Create a new health state starting as not ready but live.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the service as ready.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Flag the service as unhealthy so liveness checks fail fast during
    /// shutdown.
    pub fn mark_unhealthy(&self) {
        self.live.store(false, Ordering::Release);
    }

    /// Return readiness state.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Return liveness state. When false, liveness probes emit 503 to trigger
    /// restarts.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn probe_response(probe_ok: bool) -> HttpResponse {
        let mut response = if probe_ok {
            HttpResponse::Ok()
        } else {
            HttpResponse::ServiceUnavailable()
        };

        response
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .finish()
    }
}

/// Which check a `/health` probe asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Readiness: can the service take traffic?
    Ready,
    /// Liveness: should the process keep running?
    Live,
}

impl Probe {
    /// Read the probe kind from `X-Kubernetes-Probe`; anything but `ready`
    /// is treated as a liveness check.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(kind) if kind.eq_ignore_ascii_case("ready") => Self::Ready,
            _ => Self::Live,
        }
    }
}

/// Body returned by `/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    /// `ok` or `unavailable`.
    #[schema(example = "ok")]
    pub status: String,
}

impl HealthStatus {
    fn from_probe(probe_ok: bool) -> Self {
        let status = if probe_ok { "ok" } else { "unavailable" };
        Self {
            status: status.to_owned(),
        }
    }
}

/// Combined probe. Dispatch on `X-Kubernetes-Probe` and answer
/// `{"status":"ok"}`, or 503 `{"status":"unavailable"}`.
#[utoipa::path(
    get,
    path = "/health",
    tags = ["health"],
    security([]),
    params(
        ("X-Kubernetes-Probe" = Option<String>, Header, description = "`ready` or `live` (default)")
    ),
    responses(
        (status = 200, description = "Probe passed", body = HealthStatus),
        (status = 503, description = "Probe failed", body = HealthStatus)
    )
)]
#[get("/health")]
pub async fn health(req: HttpRequest, state: web::Data<HealthState>) -> HttpResponse {
    let raw = req
        .headers()
        .get(PROBE_HEADER)
        .and_then(|value| value.to_str().ok());
    debug!(probe = raw, "health probe");
    let probe_ok = match Probe::from_header(raw) {
        Probe::Ready => state.is_ready(),
        Probe::Live => state.is_alive(),
    };
    let mut response = if probe_ok {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };
    response
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(HealthStatus::from_probe(probe_ok))
}

/// Readiness probe. Return 200 when the server can handle traffic; return
/// 503 otherwise.
#[utoipa::path(
    get,
    path = "/health/ready",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Server is ready to handle traffic"),
        (
            status = 405,
            description = "Method not allowed; only GET probes are supported"
        ),
        (status = 503, description = "Server is not ready")
    )
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_ready())
}

/// Liveness probe. Return 200 while the process is marked alive and 503 once
/// draining. Call `HealthState::mark_unhealthy` before graceful shutdown to
/// surface the drain early.
#[utoipa::path(
    get,
    path = "/health/live",
    tags = ["health"],
    security([]),
    responses(
        (status = 200, description = "Server is alive"),
        (
            status = 405,
            description = "Method not allowed; only GET probes are supported"
        ),
        (
            status = 503,
            description = "Server is shutting down"
        )
    )
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    HealthState::probe_response(state.is_alive())
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use actix_web::App;
    use rstest::rstest;

    #[rstest]
    #[case(None, Probe::Live)]
    #[case(Some("live"), Probe::Live)]
    #[case(Some("READY"), Probe::Ready)]
    #[case(Some("startup"), Probe::Live)]
    fn probe_header_dispatch(#[case] header: Option<&str>, #[case] expected: Probe) {
        assert_eq!(Probe::from_header(header), expected);
    }

    #[rstest]
    #[case(None, true, StatusCode::OK, "ok")]
    #[case(Some("live"), true, StatusCode::OK, "ok")]
    #[case(Some("ready"), false, StatusCode::SERVICE_UNAVAILABLE, "unavailable")]
    #[case(Some("ready"), true, StatusCode::OK, "ok")]
    #[actix_web::test]
    async fn combined_probe(
        #[case] probe: Option<&'static str>,
        #[case] mark_ready: bool,
        #[case] expected_status: StatusCode,
        #[case] expected_body: &str,
    ) {
        let state = web::Data::new(HealthState::new());
        if mark_ready {
            state.mark_ready();
        }
        let app = actix_test::init_service(App::new().app_data(state).service(health)).await;
        let mut req = actix_test::TestRequest::get().uri("/health");
        if let Some(kind) = probe {
            req = req.insert_header((PROBE_HEADER, kind));
        }
        let res = actix_test::call_service(&app, req.to_request()).await;

        assert_eq!(res.status(), expected_status);
        let body: HealthStatus = actix_test::read_body_json(res).await;
        assert_eq!(body.status, expected_body);
    }

    #[actix_web::test]
    async fn live_fails_once_unhealthy() {
        let state = web::Data::new(HealthState::new());
        state.mark_unhealthy();
        let app = actix_test::init_service(App::new().app_data(state).service(live).service(ready)).await;

        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/health/live").to_request()).await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            res.headers().get(header::CACHE_CONTROL).and_then(|v| v.to_str().ok()),
            Some("no-store")
        );

        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/health/ready").to_request()).await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
