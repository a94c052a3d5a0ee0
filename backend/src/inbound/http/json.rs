//! JSON extractor configuration rendering rejections as error envelopes.

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::{web, HttpRequest};

use crate::domain::{Failure, InvalidEntityError, ValidationDetails};

use super::context::RequestContext;
use super::response::ResponseAdapter;

/// Attribute reported for body-level decode failures.
pub const BODY_ATTRIBUTE: &str = "body";

/// Map an extractor rejection onto the failure taxonomy.
///
/// A wrong content type becomes the media-type marker (rendered 415); every
/// other payload problem is a validation failure on [`BODY_ATTRIBUTE`].
#[must_use]
pub fn payload_failure(err: &JsonPayloadError) -> Failure {
    match err {
        JsonPayloadError::ContentType => {
            InvalidEntityError::media_type("expected application/json").into()
        }
        other => InvalidEntityError::new("Request", ValidationDetails::new())
            .with_detail(BODY_ATTRIBUTE, [other.to_string()])
            .into(),
    }
}

/// [`web::JsonConfig`] whose errors use the standard envelope.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use template_api::inbound::http::json::json_config;
///
/// let _app = App::new().app_data(json_config());
/// ```
#[must_use]
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req: &HttpRequest| {
        let failure = payload_failure(&err);
        let adapter = req
            .app_data::<web::Data<ResponseAdapter>>()
            .map(|data| data.get_ref().clone())
            .unwrap_or_default();
        let response = adapter.failure_response(&failure, &RequestContext::from_request(req));
        InternalError::from_response(err, response).into()
    })
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::inbound::http::envelope::ErrorEnvelope;
    use crate::inbound::http::response::ControllerResponse;
    use actix_web::http::{header, StatusCode};
    use actix_web::test as actix_test;
    use actix_web::App;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct NewOrder {
        quantity: u32,
    }

    async fn create(order: web::Json<NewOrder>) -> ControllerResponse {
        ControllerResponse::json(StatusCode::CREATED, serde_json::json!({"quantity": order.quantity}))
    }

    #[actix_web::test]
    async fn malformed_body_is_bad_request() {
        let app = actix_test::init_service(
            App::new()
                .app_data(json_config())
                .route("/orders", web::post().to(create)),
        )
        .await;
        let req = actix_test::TestRequest::post()
            .uri("/orders")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload(r#"{"quantity":"many"}"#)
            .to_request();
        let res = actix_test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let envelope: ErrorEnvelope = actix_test::read_body_json(res).await;
        assert_eq!(envelope.error.code, "400");
        assert_eq!(envelope.error.error_details.len(), 1);
        assert_eq!(envelope.error.error_details[0].attribute, BODY_ATTRIBUTE);
    }

    #[actix_web::test]
    async fn wrong_content_type_is_unsupported_media_type() {
        let app = actix_test::init_service(
            App::new()
                .app_data(json_config())
                .route("/orders", web::post().to(create)),
        )
        .await;
        let req = actix_test::TestRequest::post()
            .uri("/orders")
            .insert_header((header::CONTENT_TYPE, "text/plain"))
            .set_payload(r#"{"quantity":1}"#)
            .to_request();
        let res = actix_test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let envelope: ErrorEnvelope = actix_test::read_body_json(res).await;
        assert_eq!(envelope.error.code, "415");
        assert!(envelope.error.error_details.is_empty());
    }

    #[test]
    fn content_type_error_maps_to_media_type_marker() {
        match payload_failure(&JsonPayloadError::ContentType) {
            Failure::InvalidEntity(err) => assert!(err.is_media_type_only()),
            other => panic!("unexpected failure: {other:?}"),
        }
    }
}
