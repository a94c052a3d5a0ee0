//! Structured access log with the request body attached.
//!
//! The body is buffered up to a limit, stored as a [`RequestBody`] extension
//! for the error classifier, and replayed to the handler unchanged. Bodies
//! larger than the limit are streamed through without being captured.

use std::rc::Rc;
use std::task::{Context, Poll};
use std::time::Instant;

use actix_http::BoxedPayloadStream;
use actix_web::dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::error::PayloadError;
use actix_web::http::header::{HeaderMap, AUTHORIZATION};
use actix_web::web::{Bytes, BytesMut};
use actix_web::{Error, HttpMessage};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use futures_util::{stream, StreamExt};
use serde_json::{Map, Value};
use tracing::info;

use crate::inbound::http::context::RequestBody;
use crate::inbound::http::health::HEALTH_PATH;

/// Default cap on buffered request bodies (256 KiB).
pub const DEFAULT_BODY_LOG_LIMIT: usize = 262_144;

const REDACTED: &str = "***";

/// Logs one record per request: method, path, query, status, latency,
/// headers with `Authorization` redacted, and the JSON body.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use template_api::middleware::RequestLog;
///
/// let app = App::new().wrap(RequestLog::new(64 * 1024));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct RequestLog {
    body_limit: usize,
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::new(DEFAULT_BODY_LOG_LIMIT)
    }
}

impl RequestLog {
    /// Capture bodies up to `body_limit` bytes.
    #[must_use]
    pub const fn new(body_limit: usize) -> Self {
        Self { body_limit }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLog
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLogMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLogMiddleware {
            service: Rc::new(service),
            body_limit: self.body_limit,
        }))
    }
}

/// Service wrapper produced by [`RequestLog`].
pub struct RequestLogMiddleware<S> {
    service: Rc<S>,
    body_limit: usize,
}

impl<S, B> Service<ServiceRequest> for RequestLogMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        if req.path() == HEALTH_PATH {
            return Box::pin(self.service.call(req));
        }

        let service = Rc::clone(&self.service);
        let body_limit = self.body_limit;
        Box::pin(async move {
            let started = Instant::now();
            let mut payload = req.take_payload();
            let (prefix, complete) = buffer_prefix(&mut payload, body_limit).await?;
            let prefix = prefix.freeze();

            let body = complete.then(|| RequestBody::new(prefix.clone()));
            if let Some(body) = &body {
                req.extensions_mut().insert(body.clone());
            }
            let replay: BoxedPayloadStream =
                Box::pin(stream::once(ready(Ok::<Bytes, PayloadError>(prefix))).chain(payload));
            req.set_payload(Payload::from(replay));

            let method = req.method().to_string();
            let path = req.path().to_owned();
            let query = req.query_string().to_owned();
            let headers = redacted_headers(req.headers());

            let res = service.call(req).await?;

            let headers = serde_json::Value::Object(headers);
            let body = body
                .and_then(|body| body.json())
                .unwrap_or(serde_json::Value::Null);
            info!(
                method = %method,
                path = %path,
                query = %query,
                status = res.status().as_u16(),
                latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                %headers,
                %body,
                "request completed"
            );
            Ok(res)
        })
    }
}

/// Read at most `limit` bytes (plus the chunk that crosses it).
///
/// Returns the bytes read and whether the stream ended within the limit.
async fn buffer_prefix(
    payload: &mut Payload,
    limit: usize,
) -> Result<(BytesMut, bool), PayloadError> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = payload.next().await {
        buffer.extend_from_slice(&chunk?);
        if buffer.len() > limit {
            return Ok((buffer, false));
        }
    }
    Ok((buffer, true))
}

/// Request headers as a JSON object, with `Authorization` masked.
#[must_use]
pub fn redacted_headers(headers: &HeaderMap) -> Map<String, Value> {
    headers
        .iter()
        .map(|(name, value)| {
            let rendered = if *name == AUTHORIZATION {
                REDACTED.to_owned()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.as_str().to_owned(), Value::String(rendered))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use actix_web::http::header::CONTENT_TYPE;
    use actix_web::test::TestRequest;
    use actix_web::test as actix_test;
    use actix_web::{web, App, HttpRequest, HttpResponse};
    use rstest::rstest;

    async fn echo(req: HttpRequest, body: Bytes) -> HttpResponse {
        let captured = req.extensions().get::<RequestBody>().is_some();
        HttpResponse::Ok()
            .insert_header(("x-captured", captured.to_string()))
            .body(body)
    }

    #[rstest]
    #[case(16, r#"{"name":"x"}"#, "true")]
    #[case(4, r#"{"name":"a longer value"}"#, "false")]
    #[actix_web::test]
    async fn body_is_replayed_to_handler(
        #[case] limit: usize,
        #[case] payload: &'static str,
        #[case] captured: &str,
    ) {
        let app = actix_test::init_service(
            App::new()
                .wrap(RequestLog::new(limit))
                .route("/", web::post().to(echo)),
        )
        .await;
        let req = TestRequest::post()
            .uri("/")
            .insert_header((CONTENT_TYPE, "application/json"))
            .set_payload(payload)
            .to_request();
        let res = actix_test::call_service(&app, req).await;

        assert_eq!(
            res.headers().get("x-captured").and_then(|v| v.to_str().ok()),
            Some(captured)
        );
        let body = actix_test::read_body(res).await;
        assert_eq!(body.as_ref(), payload.as_bytes());
    }

    #[actix_web::test]
    async fn health_path_is_not_captured() {
        let app = actix_test::init_service(
            App::new()
                .wrap(RequestLog::default())
                .route(HEALTH_PATH, web::get().to(echo)),
        )
        .await;
        let res = actix_test::call_service(&app, TestRequest::get().uri(HEALTH_PATH).to_request()).await;
        assert_eq!(
            res.headers().get("x-captured").and_then(|v| v.to_str().ok()),
            Some("false")
        );
    }

    #[test]
    fn authorization_is_redacted() {
        let req = TestRequest::default()
            .insert_header((AUTHORIZATION, "Bearer secret"))
            .insert_header(("client-id", "acme"))
            .to_http_request();
        let headers = redacted_headers(req.headers());

        assert_eq!(headers.get("authorization"), Some(&Value::String("***".to_owned())));
        assert_eq!(headers.get("client-id"), Some(&Value::String("acme".to_owned())));
    }
}
