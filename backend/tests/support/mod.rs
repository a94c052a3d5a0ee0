//! Shared fixtures for integration tests: a service stack wired the way the
//! binary wires it, plus a few controllers exercising the failure taxonomy.

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{App, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use template_api::Trace;
use template_api::domain::{ErrorCatalogue, Failure, InvalidEntityError, TraceId};
use template_api::inbound::http::fallback::forbidden;
use template_api::inbound::http::health::{HealthState, health, live, ready};
use template_api::inbound::http::{ControllerResponse, ResponseAdapter, json_config};
use template_api::middleware::{ContentTypeGuard, RateLimit, RequestLog, Tenant};

/// Order accepted by the sample controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    /// Units requested; must be positive.
    pub quantity: i64,
}

#[derive(Debug, thiserror::Error)]
#[error("duplicate key value violates unique constraint \"orders_pkey\" (SQLSTATE 23505)")]
struct DuplicateKey;

async fn create_order(order: web::Json<NewOrder>) -> ControllerResponse {
    if order.quantity <= 0 {
        let invalid = InvalidEntityError::for_entity::<NewOrder>()
            .with_detail("Quantity", ["must be positive"]);
        return Failure::from(invalid).into();
    }
    ControllerResponse::json(StatusCode::CREATED, json!({ "quantity": order.quantity }))
}

async fn missing_order() -> ControllerResponse {
    Failure::not_found("order not found").into()
}

async fn duplicate_order() -> ControllerResponse {
    Failure::repository_with_source("", DuplicateKey).into()
}

async fn current_trace() -> ControllerResponse {
    let trace_id = TraceId::current().map(|id| id.to_string());
    ControllerResponse::json(StatusCode::OK, json!({ "trace_id": trace_id }))
}

/// Health state that already reports ready.
pub fn ready_state() -> web::Data<HealthState> {
    let state = HealthState::new();
    state.mark_ready();
    web::Data::new(state)
}

/// Full middleware stack with sample routes.
pub fn stack_app(
    health_state: web::Data<HealthState>,
    rate_limit: RateLimit,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let catalogue = ErrorCatalogue::embedded().expect("bundled catalogue parses");
    App::new()
        .app_data(health_state)
        .app_data(web::Data::new(ResponseAdapter::with_catalogue(Arc::new(
            catalogue,
        ))))
        .app_data(json_config())
        .wrap(rate_limit)
        .wrap(ContentTypeGuard::json_posts())
        .wrap(RequestLog::default())
        .wrap(Tenant)
        .wrap(Trace)
        .service(health)
        .service(ready)
        .service(live)
        .route("/orders", web::post().to(create_order))
        .route("/orders/missing", web::get().to(missing_order))
        .route("/orders/duplicate", web::get().to(duplicate_order))
        .route("/trace", web::get().to(current_trace))
        .default_service(web::to(forbidden))
}
