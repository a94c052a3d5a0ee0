//! Closed taxonomy of failures a use case can report.
//!
//! These failures are transport agnostic. The inbound HTTP adapter classifies
//! each variant into a status code and a JSON envelope; other adapters are free
//! to map them differently.

use std::any::type_name;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Shared, cloneable handle on an underlying error.
pub type ErrorSource = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Field-level validation failures, keyed by attribute name.
pub type ValidationDetails = BTreeMap<String, Vec<String>>;

/// A failure reported by a use case, repository, or downstream integration.
///
/// # Examples
/// ```
/// use template_api::domain::Failure;
///
/// let failure = Failure::use_case("order already shipped");
/// assert_eq!(failure.variant_name(), "UseCaseError");
/// assert_eq!(failure.to_string(), "order already shipped");
/// ```
#[derive(Debug, Clone)]
pub enum Failure {
    /// Request or entity validation failed on one or more attributes.
    InvalidEntity(InvalidEntityError),
    /// A business rule rejected the operation.
    UseCase {
        /// Client-facing explanation of the violated rule.
        description: String,
    },
    /// The requested resource does not exist.
    NotFound {
        /// Client-facing explanation of what was missing.
        description: String,
    },
    /// Saving or querying persistent state failed.
    Repository {
        /// Client-facing description; may be empty to defer to the error
        /// catalogue.
        description: String,
        /// Driver error, logged but never exposed.
        source: Option<ErrorSource>,
    },
    /// A downstream service answered with a failure or could not be reached.
    ExternalIntegration(ExternalIntegrationError),
    /// Catch-all internal failure with a client-facing description.
    Server {
        /// Client-facing description.
        description: String,
        /// Extra context recorded in logs.
        metadata: Map<String, Value>,
    },
    /// The request body uses a media type the endpoint does not accept.
    UnsupportedMediaType,
    /// The caller exceeded its request quota.
    RateLimited {
        /// Seconds until another request will be admitted.
        retry_after_secs: u64,
    },
    /// Any error outside the taxonomy.
    Unknown(ErrorSource),
}

impl Failure {
    /// Business-rule violation.
    pub fn use_case(description: impl Into<String>) -> Self {
        Self::UseCase {
            description: description.into(),
        }
    }

    /// Missing resource.
    pub fn not_found(description: impl Into<String>) -> Self {
        Self::NotFound {
            description: description.into(),
        }
    }

    /// Persistence failure without an underlying driver error.
    pub fn repository(description: impl Into<String>) -> Self {
        Self::Repository {
            description: description.into(),
            source: None,
        }
    }

    /// Persistence failure wrapping the driver error.
    pub fn repository_with_source<E>(description: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Repository {
            description: description.into(),
            source: Some(Arc::new(source)),
        }
    }

    /// Internal failure with a client-facing description.
    pub fn server(description: impl Into<String>) -> Self {
        Self::Server {
            description: description.into(),
            metadata: Map::new(),
        }
    }

    /// Wrap an error that belongs to no other variant.
    pub fn unknown<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unknown(Arc::new(source))
    }

    /// Attach a metadata entry; only [`Failure::Server`] carries metadata and
    /// other variants are returned unchanged.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        if let Self::Server { metadata, .. } = &mut self {
            metadata.insert(key.into(), value);
        }
        self
    }

    /// Stable tag used in structured logs.
    #[must_use]
    pub const fn variant_name(&self) -> &'static str {
        match self {
            Self::InvalidEntity(_) => "InvalidEntityError",
            Self::UseCase { .. } => "UseCaseError",
            Self::NotFound { .. } => "NotFoundError",
            Self::Repository { .. } => "RepositoryError",
            Self::ExternalIntegration(_) => "ExternalIntegrationError",
            Self::Server { .. } => "ServerError",
            Self::UnsupportedMediaType => "UnsupportedMediaTypeError",
            Self::RateLimited { .. } => "RateLimitedError",
            Self::Unknown(_) => "UnknownError",
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEntity(err) => write!(f, "{err}"),
            Self::UseCase { description }
            | Self::NotFound { description }
            | Self::Server { description, .. } => f.write_str(description),
            Self::Repository {
                description,
                source,
            } => match source {
                Some(source) if description.is_empty() => write!(f, "{source}"),
                _ => f.write_str(description),
            },
            Self::ExternalIntegration(err) => write!(f, "{err}"),
            Self::UnsupportedMediaType => f.write_str("unsupported media type"),
            Self::RateLimited { retry_after_secs } => {
                write!(f, "rate limited; retry after {retry_after_secs}s")
            }
            Self::Unknown(source) => write!(f, "{source}"),
        }
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Repository {
                source: Some(source),
                ..
            }
            | Self::Unknown(source) => Some(source.as_ref()),
            Self::ExternalIntegration(err) => err
                .source
                .as_ref()
                .map(|source| source.as_ref() as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<InvalidEntityError> for Failure {
    fn from(value: InvalidEntityError) -> Self {
        Self::InvalidEntity(value)
    }
}

impl From<ExternalIntegrationError> for Failure {
    fn from(value: ExternalIntegrationError) -> Self {
        Self::ExternalIntegration(value)
    }
}

/// Validation failures grouped by attribute.
///
/// A single detail keyed by the empty attribute signals that the body could
/// not be read as the expected media type at all.
///
/// # Examples
/// ```
/// use template_api::domain::InvalidEntityError;
///
/// struct Order;
///
/// let err = InvalidEntityError::for_entity::<Order>()
///     .with_detail("Quantity", ["must be positive"]);
/// assert_eq!(err.entity(), "Order");
/// assert_eq!(err.details().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidEntityError {
    entity: String,
    details: ValidationDetails,
}

impl InvalidEntityError {
    /// Build from an entity name and its attribute messages.
    pub fn new(entity: impl Into<String>, details: ValidationDetails) -> Self {
        Self {
            entity: entity.into(),
            details,
        }
    }

    /// Start an empty error named after the Rust type `T`.
    #[must_use]
    pub fn for_entity<T: ?Sized>() -> Self {
        Self::new(entity_name::<T>(), ValidationDetails::new())
    }

    /// Failure raised when the body is not in a readable media type.
    pub fn media_type(message: impl Into<String>) -> Self {
        Self::default().with_detail("", [message.into()])
    }

    /// Append messages for `attribute`, keeping earlier messages first.
    #[must_use]
    pub fn with_detail<I, M>(mut self, attribute: impl Into<String>, messages: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.details
            .entry(attribute.into())
            .or_default()
            .extend(messages.into_iter().map(Into::into));
        self
    }

    /// Name of the entity that failed validation.
    #[must_use]
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Messages per attribute.
    #[must_use]
    pub fn details(&self) -> &ValidationDetails {
        &self.details
    }

    /// Whether the only detail is the empty-attribute media type marker.
    #[must_use]
    pub fn is_media_type_only(&self) -> bool {
        self.details.len() == 1 && self.details.contains_key("")
    }
}

impl fmt::Display for InvalidEntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid entity")
    }
}

impl std::error::Error for InvalidEntityError {}

/// Short type name of `T`, without its module path or generic arguments.
#[must_use]
pub fn entity_name<T: ?Sized>() -> String {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_owned()
}

/// Failure returned by, or while reaching, a downstream service.
#[derive(Debug, Clone, Default)]
pub struct ExternalIntegrationError {
    /// Upstream HTTP status; `0` when no response was received.
    pub code: u16,
    /// Raw upstream response body.
    pub data: Vec<u8>,
    /// Request context recorded in logs (method, URL, ...).
    pub metadata: Map<String, Value>,
    /// Transport error, when the request never completed.
    pub source: Option<ErrorSource>,
}

#[derive(Deserialize)]
struct UpstreamEnvelope {
    error: UpstreamError,
}

#[derive(Deserialize)]
struct UpstreamError {
    description: Option<Value>,
}

impl ExternalIntegrationError {
    /// Upstream answered with `code` and `data`.
    pub fn new(code: u16, data: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            data: data.into(),
            ..Self::default()
        }
    }

    /// The request failed before any status was received.
    pub fn transport<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            source: Some(Arc::new(source)),
            ..Self::default()
        }
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Upstream body decoded as JSON, when it is JSON.
    #[must_use]
    pub fn data_json(&self) -> Option<Value> {
        serde_json::from_slice(&self.data).ok()
    }

    /// One-line summary for logs: `"<upstream description> - <code>"`.
    ///
    /// Falls back to the decode error when the body is not an error envelope.
    #[must_use]
    pub fn upstream_summary(&self) -> String {
        match serde_json::from_slice::<UpstreamEnvelope>(&self.data) {
            Ok(envelope) => {
                let description = envelope
                    .error
                    .description
                    .map_or_else(|| "<nil>".to_owned(), |value| match value {
                        Value::String(text) => text,
                        other => other.to_string(),
                    });
                format!("{description} - {}", self.code)
            }
            Err(err) => err.to_string(),
        }
    }
}

impl fmt::Display for ExternalIntegrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("integration error")
    }
}

impl std::error::Error for ExternalIntegrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn std::error::Error + 'static))
    }
}
