//! Behavioural tests for the composed middleware stack and health probes.

mod support;

use std::net::SocketAddr;
use std::time::Duration;

use actix_web::http::{StatusCode, header};
use actix_web::test::{self, TestRequest};
use actix_web::web;
use rstest::{fixture, rstest};
use serde_json::Value;
use template_api::inbound::http::ErrorEnvelope;
use template_api::inbound::http::health::{HealthState, HealthStatus};
use template_api::middleware::RateLimit;
use uuid::Uuid;

use support::{ready_state, stack_app};

#[fixture]
fn starting_state() -> web::Data<HealthState> {
    web::Data::new(HealthState::new())
}

#[actix_web::test]
async fn generated_trace_id_reaches_handler_and_header() {
    let app = test::init_service(stack_app(ready_state(), RateLimit::disabled())).await;
    let res = test::call_service(&app, TestRequest::get().uri("/trace").to_request()).await;

    assert_eq!(res.status(), StatusCode::OK);
    let header_value = res
        .headers()
        .get("trace-id")
        .and_then(|value| value.to_str().ok())
        .expect("trace-id header")
        .to_owned();
    let parsed = Uuid::parse_str(&header_value).expect("UUID trace id");
    assert_eq!(parsed.get_version_num(), 7);

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["trace_id"], Value::String(header_value));
}

#[actix_web::test]
async fn tenant_is_echoed() {
    let app = test::init_service(stack_app(ready_state(), RateLimit::disabled())).await;
    let req = TestRequest::get()
        .uri("/trace")
        .insert_header(("client-id", "acme"))
        .to_request();

    let res = test::call_service(&app, req).await;
    assert_eq!(
        res.headers().get("tenant_id").and_then(|v| v.to_str().ok()),
        Some("acme")
    );
}

#[actix_web::test]
async fn health_skips_trace_and_tenant_stamping() {
    let app = test::init_service(stack_app(ready_state(), RateLimit::disabled())).await;
    let req = TestRequest::get()
        .uri("/health")
        .insert_header(("client-id", "acme"))
        .insert_header(("Trace-Id", "abc123"))
        .to_request();

    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("trace-id").is_none());
    assert!(res.headers().get("tenant_id").is_none());
    let body: HealthStatus = test::read_body_json(res).await;
    assert_eq!(body.status, "ok");
}

#[rstest]
#[case(Some("ready"), StatusCode::SERVICE_UNAVAILABLE, "unavailable")]
#[case(Some("live"), StatusCode::OK, "ok")]
#[case(None, StatusCode::OK, "ok")]
#[actix_web::test]
async fn health_dispatches_on_probe_header(
    starting_state: web::Data<HealthState>,
    #[case] probe: Option<&str>,
    #[case] status: StatusCode,
    #[case] expected: &str,
) {
    let app = test::init_service(stack_app(starting_state, RateLimit::disabled())).await;
    let mut req = TestRequest::get().uri("/health");
    if let Some(probe) = probe {
        req = req.insert_header(("X-Kubernetes-Probe", probe));
    }

    let res = test::call_service(&app, req.to_request()).await;
    assert_eq!(res.status(), status);
    assert_eq!(
        res.headers().get(header::CACHE_CONTROL).and_then(|v| v.to_str().ok()),
        Some("no-store")
    );
    let body: HealthStatus = test::read_body_json(res).await;
    assert_eq!(body.status, expected);
}

#[rstest]
#[case("/health/ready", StatusCode::SERVICE_UNAVAILABLE)]
#[case("/health/live", StatusCode::OK)]
#[actix_web::test]
async fn dedicated_probes_follow_state(
    starting_state: web::Data<HealthState>,
    #[case] uri: &str,
    #[case] status: StatusCode,
) {
    let app = test::init_service(stack_app(starting_state, RateLimit::disabled())).await;
    let res = test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;
    assert_eq!(res.status(), status);
}

#[actix_web::test]
async fn rate_limited_callers_get_envelope_with_trace_id() {
    let limit = RateLimit::new(1, Duration::from_secs(60)).expect("valid quota");
    let app = test::init_service(stack_app(ready_state(), limit)).await;
    let peer = SocketAddr::from(([192, 0, 2, 7], 50_000));

    let first = TestRequest::get().uri("/trace").peer_addr(peer).to_request();
    assert_eq!(test::call_service(&app, first).await.status(), StatusCode::OK);

    let second = TestRequest::get()
        .uri("/trace")
        .peer_addr(peer)
        .insert_header(("Trace-Id", "limited-1"))
        .to_request();
    let res = test::call_service(&app, second).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(
        res.headers().get("trace-id").and_then(|v| v.to_str().ok()),
        Some("limited-1")
    );
    let envelope: ErrorEnvelope = test::read_body_json(res).await;
    assert_eq!(envelope.error.id, "limited-1");
    assert_eq!(envelope.error.code, "429");
}

#[actix_web::test]
async fn logged_bodies_are_still_delivered_to_handlers() {
    let app = test::init_service(stack_app(ready_state(), RateLimit::disabled())).await;
    let req = TestRequest::post()
        .uri("/orders")
        .insert_header((header::AUTHORIZATION, "Bearer secret"))
        .set_json(serde_json::json!({ "quantity": 5 }))
        .to_request();

    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["quantity"], 5);
}
