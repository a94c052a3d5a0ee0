//! Render handler outcomes onto a [`ResponseSink`].
//!
//! Handlers return a [`ControllerResponse`]: either a success payload with a
//! status, or a domain [`Failure`]. The [`ResponseAdapter`] classifies
//! failures, stamps the request's trace identifier into the error envelope,
//! and writes the result. Business failures are never returned from
//! [`ResponseAdapter::render`]; only serialisation and write problems are.

use std::sync::Arc;

use actix_web::body::BoxBody;
use actix_web::http::header::{self, HeaderValue};
use actix_web::http::StatusCode;
use actix_web::web::{self, Bytes};
use actix_web::{HttpRequest, HttpResponse, Responder};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::domain::{ErrorCatalogue, Failure};

use super::classifier::Classifier;
use super::context::RequestContext;
use super::sink::{HttpSink, ResponseSink};

/// Body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Value serialised as JSON.
    Json(Value),
    /// Pre-encoded JSON written verbatim.
    Raw(Bytes),
    /// No body; only valid with `204 No Content`.
    Empty,
}

/// Outcome of a handler: a success payload or a failure, never both.
///
/// # Examples
/// ```
/// use actix_web::http::StatusCode;
/// use template_api::domain::Failure;
/// use template_api::inbound::http::response::ControllerResponse;
///
/// let ok = ControllerResponse::ok(&serde_json::json!({"x": 1})).expect("serialises");
/// let created = ControllerResponse::json(StatusCode::CREATED, serde_json::json!({}));
/// let failed = ControllerResponse::from(Failure::not_found("no such order"));
/// # let _ = (ok, created, failed);
/// ```
#[derive(Debug, Clone)]
pub enum ControllerResponse {
    /// Successful outcome.
    Success {
        /// Response status.
        status: StatusCode,
        /// Response body.
        payload: Payload,
    },
    /// Failed outcome, rendered as an error envelope.
    Failure(Failure),
}

impl ControllerResponse {
    /// `200 OK` carrying `data` as JSON.
    ///
    /// # Errors
    /// Returns [`AdapterError::Serialize`] when `data` cannot be represented
    /// as JSON.
    pub fn ok<T: Serialize + ?Sized>(data: &T) -> Result<Self, AdapterError> {
        Ok(Self::json(StatusCode::OK, serde_json::to_value(data)?))
    }

    /// `status` carrying `value` as JSON.
    #[must_use]
    pub fn json(status: StatusCode, value: Value) -> Self {
        Self::Success {
            status,
            payload: Payload::Json(value),
        }
    }

    /// `status` carrying pre-encoded JSON bytes.
    pub fn raw(status: StatusCode, bytes: impl Into<Bytes>) -> Self {
        Self::Success {
            status,
            payload: Payload::Raw(bytes.into()),
        }
    }

    /// `204 No Content`.
    #[must_use]
    pub fn no_content() -> Self {
        Self::Success {
            status: StatusCode::NO_CONTENT,
            payload: Payload::Empty,
        }
    }
}

impl From<Failure> for ControllerResponse {
    fn from(value: Failure) -> Self {
        Self::Failure(value)
    }
}

impl<T: Serialize> From<Result<T, Failure>> for ControllerResponse {
    fn from(value: Result<T, Failure>) -> Self {
        match value {
            Ok(data) => match serde_json::to_value(&data) {
                Ok(value) => Self::json(StatusCode::OK, value),
                Err(err) => Self::Failure(Failure::unknown(err)),
            },
            Err(failure) => Self::Failure(failure),
        }
    }
}

/// Problems writing a response; business failures are not reported here.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// A success other than `204 No Content` carried no payload.
    #[error("status {status} requires a payload")]
    MissingPayload {
        /// Status the handler asked for.
        status: StatusCode,
    },
    /// The payload or envelope could not be serialised.
    #[error("failed to serialise response: {0}")]
    Serialize(#[from] serde_json::Error),
    /// The sink rejected the bytes.
    #[error("failed to write response: {0}")]
    Write(#[from] std::io::Error),
}

/// Turns [`ControllerResponse`] values into written responses.
///
/// Register one as app data so the [`Responder`] binding picks up the
/// configured catalogue:
///
/// ```
/// use std::sync::Arc;
/// use actix_web::{web, App};
/// use template_api::domain::ErrorCatalogue;
/// use template_api::inbound::http::response::ResponseAdapter;
///
/// let catalogue = ErrorCatalogue::embedded().expect("bundled catalogue parses");
/// let adapter = web::Data::new(ResponseAdapter::with_catalogue(Arc::new(catalogue)));
/// let _app = App::new().app_data(adapter);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResponseAdapter {
    classifier: Classifier,
}

impl ResponseAdapter {
    /// Adapter using `classifier`.
    #[must_use]
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }

    /// Adapter whose classifier resolves repository failures via `catalogue`.
    #[must_use]
    pub fn with_catalogue(catalogue: Arc<ErrorCatalogue>) -> Self {
        Self::new(Classifier::new(catalogue))
    }

    /// The classifier in use.
    #[must_use]
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Write `response` to `sink`.
    ///
    /// # Errors
    /// Returns [`AdapterError::MissingPayload`] for an empty success other
    /// than 204, and serialisation or sink failures otherwise.
    pub fn render<S: ResponseSink>(
        &self,
        response: ControllerResponse,
        context: &RequestContext,
        sink: &mut S,
    ) -> Result<(), AdapterError> {
        match response {
            ControllerResponse::Failure(failure) => self.render_failure(&failure, context, sink),
            ControllerResponse::Success { status, payload } => {
                render_success(status, payload, sink)
            }
        }
    }

    /// Classify and write `failure` as an error envelope.
    ///
    /// # Errors
    /// Returns serialisation or sink failures.
    pub fn render_failure<S: ResponseSink>(
        &self,
        failure: &Failure,
        context: &RequestContext,
        sink: &mut S,
    ) -> Result<(), AdapterError> {
        let classification = self.classifier.classify(failure, context.body());
        let status = classification.status;
        let retry_after = classification.retry_after_secs;
        let envelope = classification
            .into_api_error(context.trace_id())
            .into_envelope();
        let body = serde_json::to_vec(&envelope)?;

        sink.set_status(status);
        sink.insert_header(header::CONTENT_TYPE, json_content_type());
        if let Some(secs) = retry_after {
            sink.insert_header(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        sink.write_body(Bytes::from(body))?;
        Ok(())
    }

    /// Render `failure` into an actix response for `context`.
    ///
    /// Used by middleware that rejects requests before a handler runs.
    #[must_use]
    pub fn failure_response(&self, failure: &Failure, context: &RequestContext) -> HttpResponse {
        let mut sink = HttpSink::default();
        match self.render_failure(failure, context, &mut sink) {
            Ok(()) => sink.into_response(),
            Err(err) => {
                error!(error = %err, "failed to render error envelope");
                HttpResponse::InternalServerError().finish()
            }
        }
    }
}

fn json_content_type() -> HeaderValue {
    HeaderValue::from_static("application/json")
}

fn render_success<S: ResponseSink>(
    status: StatusCode,
    payload: Payload,
    sink: &mut S,
) -> Result<(), AdapterError> {
    sink.set_status(status);
    match payload {
        Payload::Empty if status == StatusCode::NO_CONTENT => Ok(()),
        Payload::Empty => Err(AdapterError::MissingPayload { status }),
        Payload::Raw(bytes) if bytes.is_empty() => Ok(()),
        Payload::Raw(bytes) => {
            sink.insert_header(header::CONTENT_TYPE, json_content_type());
            sink.write_body(bytes)?;
            Ok(())
        }
        Payload::Json(value) => {
            let body = serde_json::to_vec(&value)?;
            sink.insert_header(header::CONTENT_TYPE, json_content_type());
            sink.write_body(Bytes::from(body))?;
            Ok(())
        }
    }
}

impl Responder for ControllerResponse {
    type Body = BoxBody;

    fn respond_to(self, req: &HttpRequest) -> HttpResponse<Self::Body> {
        let context = RequestContext::from_request(req);
        let adapter = req
            .app_data::<web::Data<ResponseAdapter>>()
            .map(|data| data.get_ref().clone())
            .unwrap_or_default();

        let mut sink = HttpSink::default();
        match adapter.render(self, &context, &mut sink) {
            Ok(()) => sink.into_response(),
            Err(err) => {
                error!(error = %err, trace_id = %context.trace_id(), "failed to render response");
                let internal = Failure::unknown(err);
                adapter.failure_response(&internal, &context)
            }
        }
    }
}
