//! Canonical JSON error envelope returned to API clients.
//!
//! ```json
//! {"error": {"id": "...", "code": "400", "description": "Bad Request",
//!            "error_details": [{"attribute": "name", "messages": ["..."]}]}}
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Messages attached to one request attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Lower-cased attribute name.
    #[schema(example = "quantity")]
    pub attribute: String,
    /// Validation messages in the order they were raised.
    #[schema(example = json!(["must be positive"]))]
    pub messages: Vec<String>,
}

/// Error payload rendered for every failed request.
///
/// # Examples
/// ```
/// use template_api::inbound::http::envelope::ApiError;
///
/// let error = ApiError::new("abc123", "400", "Bad Request")
///     .with_detail("name", ["is required"]);
/// let json = serde_json::to_value(&error).expect("serialises");
/// assert_eq!(json["error_details"][0]["attribute"], "name");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Trace identifier of the request that failed.
    #[schema(example = "0190a3b2-7c1e-7d4f-9a51-3f2c1d0e9b8a")]
    pub id: String,
    /// Status code, or a composite `"<status>-<detail>"` code.
    #[schema(example = "422")]
    pub code: String,
    /// Human-readable message safe for clients.
    #[schema(example = "order already shipped")]
    pub description: String,
    /// Per-attribute validation messages; omitted when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_details: Vec<ErrorDetail>,
}

impl ApiError {
    /// Build an error without details.
    pub fn new(
        id: impl Into<String>,
        code: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            description: description.into(),
            error_details: Vec::new(),
        }
    }

    /// Append one detail entry.
    #[must_use]
    pub fn with_detail<I, M>(mut self, attribute: impl Into<String>, messages: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        self.error_details.push(ErrorDetail {
            attribute: attribute.into(),
            messages: messages.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Join a base code and a detail code as `"base-detail"`.
    ///
    /// # Examples
    /// ```
    /// use template_api::inbound::http::envelope::ApiError;
    ///
    /// assert_eq!(ApiError::composite_code("422", "01"), "422-01");
    /// ```
    #[must_use]
    pub fn composite_code(base: &str, detail: &str) -> String {
        format!("{base}-{detail}")
    }

    /// Wrap in the `{"error": ...}` envelope.
    #[must_use]
    pub fn into_envelope(self) -> ErrorEnvelope {
        ErrorEnvelope { error: self }
    }
}

/// Top-level `{"error": ...}` wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    /// The error payload.
    pub error: ApiError,
}
