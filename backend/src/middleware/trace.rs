//! Tracing middleware attaching a request-scoped trace identifier.
//!
//! Each incoming request is correlated by a [`TraceId`]: the caller's
//! `Trace-Id` header when usable, otherwise a freshly generated UUIDv7. The
//! identifier is stored in task-local storage, inserted as a request
//! extension, recorded on a `tracing` span, and echoed in the response.
//!
//! Tokio task-local variables are not inherited across spawned tasks. Use
//! [`TraceId::scope`] when spawning new tasks or moving work onto blocking
//! threads to ensure the active trace identifier propagates correctly.

use std::task::{Context, Poll};

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{Error, HttpMessage};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use tracing::{error, info_span, Instrument};

use crate::domain::{TraceId, TRACE_ID_HEADER};
use crate::inbound::http::health::HEALTH_PATH;

/// Tracing middleware attaching a request-scoped identifier and adding a
/// `Trace-Id` header to every response.
///
/// Handlers can read the trace ID via [`TraceId::current`]. Requests to
/// `/health` pass through untouched.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use template_api::Trace;
///
/// let app = App::new().wrap(Trace);
/// ```
#[derive(Clone)]
pub struct Trace;

impl<S, B> Transform<S, ServiceRequest> for Trace
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TraceMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TraceMiddleware { service }))
    }
}

/// Service wrapper produced by [`Trace`].
///
/// Applications should not use this type directly.
pub struct TraceMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for TraceMiddleware<S>
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

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if req.path() == HEALTH_PATH {
            return Box::pin(self.service.call(req));
        }

        let (trace_id, echoed) = resolve(req.headers().get(TRACE_ID_HEADER));
        req.extensions_mut().insert(trace_id.clone());
        let span = info_span!(
            "request",
            trace_id = %trace_id,
            method = %req.method(),
            path = %req.path()
        );

        // Inner layers may answer synchronously from `call`.
        let fut = span.in_scope(|| {
            TraceId::sync_scope(trace_id.clone(), || self.service.call(req))
        });
        Box::pin(TraceId::scope(
            trace_id.clone(),
            async move {
                let mut res = fut.await?;
                match echoed {
                    Some(value) => {
                        res.response_mut()
                            .headers_mut()
                            .insert(HeaderName::from_static("trace-id"), value);
                    }
                    None => {
                        error!(trace_id = %trace_id, "failed to encode trace identifier header");
                    }
                }
                Ok(res)
            }
            .instrument(span),
        ))
    }
}

/// Resolve the request's trace identifier and the header value echoed back.
///
/// A supplied header is echoed byte for byte; a generated identifier is
/// encoded afresh.
fn resolve(inbound: Option<&HeaderValue>) -> (TraceId, Option<HeaderValue>) {
    let supplied = inbound.and_then(|value| {
        TraceId::from_header_bytes(value.as_bytes())
            .ok()
            .map(|trace_id| (trace_id, value.clone()))
    });
    if let Some((trace_id, value)) = supplied {
        return (trace_id, Some(value));
    }
    let trace_id = TraceId::generate();
    let echoed = HeaderValue::from_str(trace_id.as_str()).ok();
    (trace_id, echoed)
}
