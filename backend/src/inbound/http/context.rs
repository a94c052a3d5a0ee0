//! Per-request values the response adapter needs besides the outcome itself.

use actix_web::http::header::HeaderValue;
use actix_web::web::Bytes;
use actix_web::{HttpMessage, HttpRequest};
use serde_json::Value;

use crate::domain::{TraceId, TRACE_ID_HEADER};

/// Buffered inbound request body, stored as a request extension by the
/// request-logging middleware.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestBody(Bytes);

impl RequestBody {
    /// Wrap buffered body bytes.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Raw body bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Body decoded as JSON; `None` when empty or not JSON.
    #[must_use]
    pub fn json(&self) -> Option<Value> {
        if self.0.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.0).ok()
    }
}

/// Request data consulted while rendering a response.
#[derive(Debug, Clone)]
pub struct RequestContext {
    trace_id: TraceId,
    body: Option<RequestBody>,
}

impl RequestContext {
    /// Context carrying only a trace identifier.
    #[must_use]
    pub fn new(trace_id: TraceId) -> Self {
        Self {
            trace_id,
            body: None,
        }
    }

    /// Attach the buffered request body.
    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Build from an actix request.
    ///
    /// The trace identifier is taken from task-local scope, then the request
    /// extension set by the trace middleware, then the `Trace-Id` header. A
    /// fresh identifier is generated when none of those is available.
    #[must_use]
    pub fn from_request(req: &HttpRequest) -> Self {
        let trace_id = TraceId::current()
            .or_else(|| req.extensions().get::<TraceId>().cloned())
            .unwrap_or_else(|| {
                TraceId::from_inbound(
                    req.headers()
                        .get(TRACE_ID_HEADER)
                        .map(HeaderValue::as_bytes),
                )
            });
        let body = req.extensions().get::<RequestBody>().cloned();
        Self { trace_id, body }
    }

    /// Trace identifier stamped into error envelopes.
    #[must_use]
    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    /// Buffered request body, when the logging middleware captured one.
    #[must_use]
    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }
}
