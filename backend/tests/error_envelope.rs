//! End-to-end coverage of the error envelope through the full middleware
//! stack: trace stamping, classification, and payload rejections.

mod support;

use actix_web::http::{StatusCode, header};
use actix_web::test::{self, TestRequest};
use rstest::rstest;
use serde_json::Value;
use template_api::inbound::http::ErrorEnvelope;
use template_api::middleware::RateLimit;

use support::{ready_state, stack_app};

fn trace_header(res: &actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>) -> String {
    res.headers()
        .get("trace-id")
        .and_then(|value| value.to_str().ok())
        .expect("trace-id header")
        .to_owned()
}

#[actix_web::test]
async fn invalid_entity_lists_lowercased_attributes() {
    let app = test::init_service(stack_app(ready_state(), RateLimit::disabled())).await;
    let req = TestRequest::post()
        .uri("/orders")
        .insert_header(("Trace-Id", "abc123"))
        .set_json(serde_json::json!({ "quantity": 0 }))
        .to_request();

    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(trace_header(&res), "abc123");
    let envelope: ErrorEnvelope = test::read_body_json(res).await;
    assert_eq!(envelope.error.id, "abc123");
    assert_eq!(envelope.error.code, "400");
    assert_eq!(envelope.error.description, "Bad Request");
    assert_eq!(envelope.error.error_details.len(), 1);
    assert_eq!(envelope.error.error_details[0].attribute, "quantity");
    assert_eq!(
        envelope.error.error_details[0].messages,
        vec!["must be positive".to_owned()]
    );
}

#[actix_web::test]
async fn success_passes_through_untouched() {
    let app = test::init_service(stack_app(ready_state(), RateLimit::disabled())).await;
    let req = TestRequest::post()
        .uri("/orders")
        .set_json(serde_json::json!({ "quantity": 3 }))
        .to_request();

    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body, serde_json::json!({ "quantity": 3 }));
}

#[rstest]
#[case("/orders/missing", StatusCode::NOT_FOUND, "404", "order not found")]
#[case(
    "/orders/duplicate",
    StatusCode::UNPROCESSABLE_ENTITY,
    "422",
    "Record already exists"
)]
#[actix_web::test]
async fn failures_render_classified_envelopes(
    #[case] uri: &str,
    #[case] status: StatusCode,
    #[case] code: &str,
    #[case] description: &str,
) {
    let app = test::init_service(stack_app(ready_state(), RateLimit::disabled())).await;
    let res = test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;

    assert_eq!(res.status(), status);
    assert_eq!(
        res.headers().get(header::CONTENT_TYPE).map(|v| v.as_bytes()),
        Some(b"application/json".as_slice())
    );
    let trace_id = trace_header(&res);
    let envelope: ErrorEnvelope = test::read_body_json(res).await;
    assert_eq!(envelope.error.id, trace_id);
    assert_eq!(envelope.error.code, code);
    assert_eq!(envelope.error.description, description);
    assert!(envelope.error.error_details.is_empty());
}

#[actix_web::test]
async fn non_json_post_is_rejected_with_trace_id() {
    let app = test::init_service(stack_app(ready_state(), RateLimit::disabled())).await;
    let req = TestRequest::post()
        .uri("/orders")
        .insert_header(("Trace-Id", "abc123"))
        .insert_header((header::CONTENT_TYPE, "text/plain"))
        .set_payload("quantity=1")
        .to_request();

    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let envelope: ErrorEnvelope = test::read_body_json(res).await;
    assert_eq!(envelope.error.id, "abc123");
    assert_eq!(envelope.error.code, "415");
    assert_eq!(envelope.error.description, "Unsupported Media Type");
}

#[actix_web::test]
async fn malformed_json_is_a_body_validation_failure() {
    let app = test::init_service(stack_app(ready_state(), RateLimit::disabled())).await;
    let req = TestRequest::post()
        .uri("/orders")
        .insert_header((header::CONTENT_TYPE, "application/json; charset=utf-8"))
        .set_payload("{\"quantity\":")
        .to_request();

    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let envelope: ErrorEnvelope = test::read_body_json(res).await;
    assert_eq!(envelope.error.code, "400");
    assert_eq!(envelope.error.error_details.len(), 1);
    assert_eq!(envelope.error.error_details[0].attribute, "body");
}

#[actix_web::test]
async fn unrouted_paths_are_forbidden() {
    let app = test::init_service(stack_app(ready_state(), RateLimit::disabled())).await;
    let res = test::call_service(&app, TestRequest::get().uri("/nope").to_request()).await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body, serde_json::json!({ "message": "Forbidden" }));
}
