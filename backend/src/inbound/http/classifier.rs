//! Map domain failures onto HTTP status codes and envelope fields.
//!
//! Purpose: keep [`Failure`] HTTP-agnostic while giving every variant one
//! stable rendering. Classification is pure apart from a single structured
//! log record per call, so classifying the same failure twice yields the same
//! result.

use std::sync::Arc;

use actix_web::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::domain::{ErrorCatalogue, ExternalIntegrationError, Failure, InvalidEntityError, TraceId};

use super::context::RequestBody;
use super::envelope::{ApiError, ErrorDetail};

const BAD_REQUEST: &str = "Bad Request";
const UNSUPPORTED_MEDIA_TYPE: &str = "Unsupported Media Type";
const TOO_MANY_REQUESTS: &str = "Too Many Requests";
const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

/// Outcome of classifying a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Response status.
    pub status: StatusCode,
    /// Envelope `code`; the numeric status unless an upstream supplied one.
    pub code: String,
    /// Envelope `description`.
    pub description: String,
    /// Envelope `error_details`.
    pub details: Vec<ErrorDetail>,
    /// Seconds to advertise in `Retry-After`, for throttled requests.
    pub retry_after_secs: Option<u64>,
}

impl Classification {
    fn new(status: StatusCode, description: impl Into<String>) -> Self {
        Self {
            status,
            code: status.as_u16().to_string(),
            description: description.into(),
            details: Vec::new(),
            retry_after_secs: None,
        }
    }

    /// Like [`Classification::new`], substituting the status text for a blank
    /// description.
    fn described(status: StatusCode, description: &str) -> Self {
        if description.trim().is_empty() {
            Self::new(status, status.canonical_reason().unwrap_or(INTERNAL_SERVER_ERROR))
        } else {
            Self::new(status, description)
        }
    }

    fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_SERVER_ERROR)
    }

    /// Build the envelope payload stamped with `trace_id`.
    #[must_use]
    pub fn into_api_error(self, trace_id: &TraceId) -> ApiError {
        ApiError {
            id: trace_id.to_string(),
            code: self.code,
            description: self.description,
            error_details: self.details,
        }
    }
}

/// Fields recovered from an upstream error envelope.
///
/// Each field is decoded on its own so a mistyped `code` does not discard a
/// usable `description`.
#[derive(Debug, Default)]
struct UpstreamApiError {
    code: Option<String>,
    description: Option<String>,
    error_details: Vec<ErrorDetail>,
}

impl UpstreamApiError {
    fn decode(data: &[u8]) -> Result<Self, UpstreamDecodeError> {
        let body: Value = serde_json::from_slice(data)?;
        let Some(error) = body.get("error").and_then(Value::as_object) else {
            return Err(UpstreamDecodeError::NotAnEnvelope);
        };
        let code = error.get("code").and_then(|code| match code {
            Value::String(code) => Some(code.clone()),
            Value::Number(code) => Some(code.to_string()),
            _ => None,
        });
        let description = error
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let error_details = error
            .get("error_details")
            .cloned()
            .and_then(|details| Vec::<ErrorDetail>::deserialize(details).ok())
            .unwrap_or_default();
        Ok(Self {
            code,
            description,
            error_details,
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum UpstreamDecodeError {
    #[error("upstream body is not JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("upstream body has no `error` object")]
    NotAnEnvelope,
}

/// Classifies [`Failure`] values for the HTTP adapter.
///
/// The optional [`ErrorCatalogue`] supplies descriptions for repository
/// failures that carry none of their own.
///
/// # Examples
/// ```
/// use actix_web::http::StatusCode;
/// use template_api::domain::Failure;
/// use template_api::inbound::http::classifier::Classifier;
///
/// let classification = Classifier::default().classify(&Failure::use_case("sold out"), None);
/// assert_eq!(classification.status, StatusCode::UNPROCESSABLE_ENTITY);
/// assert_eq!(classification.description, "sold out");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    catalogue: Option<Arc<ErrorCatalogue>>,
}

impl Classifier {
    /// Classifier resolving repository descriptions through `catalogue`.
    #[must_use]
    pub fn new(catalogue: Arc<ErrorCatalogue>) -> Self {
        Self {
            catalogue: Some(catalogue),
        }
    }

    /// Catalogue in use, if any.
    #[must_use]
    pub fn catalogue(&self) -> Option<&ErrorCatalogue> {
        self.catalogue.as_deref()
    }

    /// Classify `failure`, logging it together with the decoded request body.
    #[must_use]
    pub fn classify(&self, failure: &Failure, body: Option<&RequestBody>) -> Classification {
        let payload = body.and_then(RequestBody::json).unwrap_or(Value::Null);
        log_failure(failure, &payload);

        match failure {
            Failure::InvalidEntity(err) => classify_invalid_entity(err),
            Failure::UseCase { description } | Failure::Server { description, .. } => {
                Classification::described(StatusCode::UNPROCESSABLE_ENTITY, description)
            }
            Failure::Repository {
                description,
                source,
            } => {
                let description = if description.trim().is_empty() {
                    let message = source
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_default();
                    self.catalogue_description(&message)
                } else {
                    description.clone()
                };
                Classification::described(StatusCode::UNPROCESSABLE_ENTITY, &description)
            }
            Failure::NotFound { description } => {
                Classification::described(StatusCode::NOT_FOUND, description)
            }
            Failure::UnsupportedMediaType => {
                Classification::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, UNSUPPORTED_MEDIA_TYPE)
            }
            Failure::RateLimited { retry_after_secs } => Classification {
                retry_after_secs: Some(*retry_after_secs),
                ..Classification::new(StatusCode::TOO_MANY_REQUESTS, TOO_MANY_REQUESTS)
            },
            Failure::ExternalIntegration(err) => classify_integration(err),
            Failure::Unknown(_) => Classification::internal(),
        }
    }

    fn catalogue_description(&self, message: &str) -> String {
        self.catalogue.as_ref().map_or_else(
            || INTERNAL_SERVER_ERROR.to_owned(),
            |catalogue| catalogue.resolve(message).description.clone(),
        )
    }
}

fn classify_invalid_entity(err: &InvalidEntityError) -> Classification {
    if err.is_media_type_only() {
        return Classification::new(StatusCode::UNSUPPORTED_MEDIA_TYPE, UNSUPPORTED_MEDIA_TYPE);
    }
    let mut classification = Classification::new(StatusCode::BAD_REQUEST, BAD_REQUEST);
    classification.details = err
        .details()
        .iter()
        .map(|(attribute, messages)| ErrorDetail {
            attribute: attribute.to_lowercase(),
            messages: messages.clone(),
        })
        .collect();
    classification
}

fn passthrough_status(code: u16) -> Option<StatusCode> {
    match code {
        400 => Some(StatusCode::BAD_REQUEST),
        404 => Some(StatusCode::NOT_FOUND),
        422 => Some(StatusCode::UNPROCESSABLE_ENTITY),
        429 => Some(StatusCode::TOO_MANY_REQUESTS),
        _ => None,
    }
}

fn classify_integration(err: &ExternalIntegrationError) -> Classification {
    let Some(status) = passthrough_status(err.code) else {
        return Classification::internal();
    };
    let mut classification = Classification::new(status, err.to_string());
    match UpstreamApiError::decode(&err.data) {
        Ok(upstream) => {
            if let Some(code) = upstream.code.filter(|code| !code.trim().is_empty()) {
                classification.code = code;
            }
            if let Some(description) = upstream
                .description
                .filter(|description| !description.trim().is_empty())
            {
                classification.description = description;
            }
            classification.details = upstream.error_details;
        }
        Err(decode_error) => {
            let trace_id = TraceId::current();
            debug!(
                error = %decode_error,
                code = err.code,
                trace_id = ?trace_id.as_ref().map(TraceId::as_str),
                "upstream error body is not an error envelope"
            );
        }
    }
    classification
}

fn log_failure(failure: &Failure, payload: &Value) {
    let kind = failure.variant_name();
    match failure {
        Failure::InvalidEntity(err) => error!(
            failure_type = kind,
            entity = err.entity(),
            details = ?err.details(),
            "{failure}"
        ),
        Failure::Repository { source, .. } => error!(
            failure_type = kind,
            error = ?source.as_ref().map(ToString::to_string),
            %payload,
            "{failure}"
        ),
        Failure::Server { metadata, .. } => {
            let metadata = serde_json::Value::Object(metadata.clone());
            error!(failure_type = kind, %metadata, %payload, "{failure}");
        }
        Failure::ExternalIntegration(err) => {
            let request = serde_json::Value::Object(err.metadata.clone());
            error!(
                failure_type = kind,
                code = err.code,
                response = %err.upstream_summary(),
                %request,
                error = ?err.source.as_ref().map(ToString::to_string),
                "{failure}"
            );
        }
        Failure::UseCase { .. }
        | Failure::NotFound { .. }
        | Failure::UnsupportedMediaType
        | Failure::RateLimited { .. }
        | Failure::Unknown(_) => error!(failure_type = kind, %payload, "{failure}"),
    }
}
