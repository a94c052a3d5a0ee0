//! Reject request bodies in media types the API does not accept.

use std::rc::Rc;
use std::task::{Context, Poll};

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::{header, Method};
use actix_web::{web, Error};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use tracing::debug;

use crate::domain::Failure;
use crate::inbound::http::context::RequestContext;
use crate::inbound::http::response::ResponseAdapter;

/// Answers 415 with an error envelope when a request using the guarded method
/// declares a `Content-Type` outside the allowed list.
///
/// Media type parameters such as `; charset=utf-8` are ignored and the
/// comparison is case-insensitive. Other methods pass through.
///
/// # Examples
/// ```
/// use actix_web::http::Method;
/// use actix_web::App;
/// use template_api::middleware::ContentTypeGuard;
///
/// let app = App::new().wrap(ContentTypeGuard::new(Method::POST, ["application/json"]));
/// ```
#[derive(Clone, Debug)]
pub struct ContentTypeGuard {
    rules: Rc<GuardRules>,
}

#[derive(Debug)]
struct GuardRules {
    method: Method,
    allowed: Vec<String>,
}

impl GuardRules {
    fn accepts(&self, req: &ServiceRequest) -> bool {
        if *req.method() != self.method {
            return true;
        }
        let media_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(str::trim)
            .unwrap_or_default();
        self.allowed
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(media_type))
    }
}

impl ContentTypeGuard {
    /// Guard `method`, allowing only the listed media types.
    pub fn new<I, T>(method: Method, allowed: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            rules: Rc::new(GuardRules {
                method,
                allowed: allowed.into_iter().map(Into::into).collect(),
            }),
        }
    }

    /// The guard installed by the server: `POST` bodies must be JSON.
    #[must_use]
    pub fn json_posts() -> Self {
        Self::new(Method::POST, ["application/json"])
    }
}

impl<S, B> Transform<S, ServiceRequest> for ContentTypeGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = ContentTypeGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ContentTypeGuardMiddleware {
            service,
            rules: Rc::clone(&self.rules),
        }))
    }
}

/// Service wrapper produced by [`ContentTypeGuard`].
pub struct ContentTypeGuardMiddleware<S> {
    service: S,
    rules: Rc<GuardRules>,
}

impl<S, B> Service<ServiceRequest> for ContentTypeGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if self.rules.accepts(&req) {
            let fut = self.service.call(req);
            return Box::pin(async move { Ok(fut.await?.map_into_left_body()) });
        }

        debug!(
            method = %req.method(),
            content_type = ?req.headers().get(header::CONTENT_TYPE),
            "rejecting unsupported media type"
        );
        let adapter = req
            .app_data::<web::Data<ResponseAdapter>>()
            .map(|data| data.get_ref().clone())
            .unwrap_or_default();
        let context = RequestContext::from_request(req.request());
        let response = adapter.failure_response(&Failure::UnsupportedMediaType, &context);
        Box::pin(ready(Ok(req.into_response(response).map_into_right_body())))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::TRACE_ID_HEADER;
    use crate::inbound::http::envelope::ErrorEnvelope;
    use crate::Trace;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use actix_web::{App, HttpResponse};
    use rstest::rstest;

    #[rstest]
    #[case("application/json", StatusCode::OK)]
    #[case("application/json; charset=utf-8", StatusCode::OK)]
    #[case("Application/JSON", StatusCode::OK)]
    #[case("text/plain", StatusCode::UNSUPPORTED_MEDIA_TYPE)]
    #[case("application/xml", StatusCode::UNSUPPORTED_MEDIA_TYPE)]
    #[actix_web::test]
    async fn post_content_type_is_checked(#[case] content_type: &str, #[case] expected: StatusCode) {
        let app = actix_test::init_service(
            App::new()
                .wrap(ContentTypeGuard::json_posts())
                .route("/", web::post().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let req = actix_test::TestRequest::post()
            .uri("/")
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload("{}")
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), expected);
    }

    #[actix_web::test]
    async fn missing_content_type_on_post_is_rejected() {
        let app = actix_test::init_service(
            App::new()
                .wrap(ContentTypeGuard::json_posts())
                .route("/", web::post().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let res = actix_test::call_service(&app, actix_test::TestRequest::post().uri("/").to_request()).await;
        assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[actix_web::test]
    async fn other_methods_pass_through() {
        let app = actix_test::init_service(
            App::new()
                .wrap(ContentTypeGuard::json_posts())
                .route("/", web::put().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let req = actix_test::TestRequest::put()
            .uri("/")
            .insert_header((header::CONTENT_TYPE, "text/plain"))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn rejection_envelope_carries_trace_id() {
        let app = actix_test::init_service(
            App::new()
                .wrap(ContentTypeGuard::json_posts())
                .wrap(Trace)
                .route("/", web::post().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let req = actix_test::TestRequest::post()
            .uri("/")
            .insert_header((header::CONTENT_TYPE, "text/plain"))
            .insert_header((TRACE_ID_HEADER, "abc123"))
            .to_request();
        let res = actix_test::call_service(&app, req).await;

        assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(
            res.headers().get("trace-id").and_then(|v| v.to_str().ok()),
            Some("abc123")
        );
        let envelope: ErrorEnvelope = actix_test::read_body_json(res).await;
        assert_eq!(envelope.error.id, "abc123");
        assert_eq!(envelope.error.code, "415");
        assert_eq!(envelope.error.description, "Unsupported Media Type");
    }
}
