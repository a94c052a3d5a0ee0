//! Request-scoped trace identifier for correlation across logs and errors.
//!
//! `TraceId` is a domain primitive representing a correlation identifier that
//! follows a request through the system. Inbound adapters echo the identifier
//! supplied by the caller when it is usable and mint a fresh, time-ordered one
//! otherwise. It uses task-local storage to make the current trace identifier
//! available without explicit parameter threading.
//!
//! Tokio task-local variables are not inherited across spawned tasks. Use
//! [`TraceId::scope`] when spawning new tasks or moving work onto blocking
//! threads to ensure the active trace identifier propagates correctly.

use std::future::Future;
use std::sync::Arc;

use tokio::task_local;
use uuid::Uuid;

/// Conventional header carrying the trace identifier in both directions.
pub const TRACE_ID_HEADER: &str = "Trace-Id";

task_local! {
    /// Task-local storage for the current trace identifier.
    pub(crate) static TRACE_ID: TraceId;
}

/// Reasons an inbound value cannot be used as a trace identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceIdError {
    /// The value is empty once trimmed.
    #[error("trace identifier must not be empty")]
    Empty,
    /// The value contains control characters other than tab.
    #[error("trace identifier must not contain control characters")]
    InvalidCharacter,
}

/// Per-request trace identifier exposed via task-local storage.
///
/// # Examples
/// ```
/// use template_api::TraceId;
///
/// async fn handler() {
///     if let Some(id) = TraceId::current() {
///         println!("trace id: {}", id);
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceId(Arc<str>);

impl TraceId {
    /// Generate a new time-ordered trace identifier.
    ///
    /// Identifiers are UUIDv7 strings, so they sort lexically by creation
    /// time.
    #[must_use]
    pub fn generate() -> Self {
        Self(Arc::from(Uuid::now_v7().to_string()))
    }

    /// Accept a caller-supplied identifier.
    ///
    /// Any non-blank value is kept as sent, apart from surrounding
    /// whitespace. Spaces, long values and non-ASCII text are all echoed.
    ///
    /// # Errors
    /// Returns [`TraceIdError`] when the value is blank or holds control
    /// characters that no header may carry.
    pub fn parse(value: &str) -> Result<Self, TraceIdError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TraceIdError::Empty);
        }
        if trimmed.chars().any(|c| c.is_control() && c != '\t') {
            return Err(TraceIdError::InvalidCharacter);
        }
        Ok(Self(Arc::from(trimmed)))
    }

    /// Accept raw header bytes. Bytes that are not UTF-8 are decoded lossily.
    ///
    /// # Errors
    /// As [`TraceId::parse`].
    pub fn from_header_bytes(bytes: &[u8]) -> Result<Self, TraceIdError> {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// Echo `inbound` header bytes when present and non-blank, otherwise
    /// generate a fresh identifier.
    #[must_use]
    pub fn from_inbound(inbound: Option<&[u8]>) -> Self {
        inbound
            .and_then(|bytes| Self::from_header_bytes(bytes).ok())
            .unwrap_or_else(Self::generate)
    }

    /// Returns the current trace identifier if one is in scope.
    #[must_use]
    pub fn current() -> Option<Self> {
        TRACE_ID.try_with(Clone::clone).ok()
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Execute the provided future with the supplied trace identifier in scope.
    ///
    /// # Examples
    /// ```
    /// use template_api::TraceId;
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let trace_id: TraceId = "abc123".parse().expect("valid trace id");
    /// let observed = TraceId::scope(trace_id.clone(), async move { TraceId::current() }).await;
    /// assert_eq!(observed, Some(trace_id));
    /// # });
    /// ```
    pub async fn scope<Fut>(trace_id: TraceId, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        TRACE_ID.scope(trace_id, fut).await
    }

    /// Run the synchronous closure `f` with `trace_id` in scope.
    pub fn sync_scope<F, R>(trace_id: TraceId, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        TRACE_ID.sync_scope(trace_id, f)
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TraceId {
    type Err = TraceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for TraceId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[test]
    fn generate_produces_uuid_v7() {
        let trace_id = TraceId::generate();
        let parsed = Uuid::parse_str(trace_id.as_str()).expect("valid UUID");
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn generated_ids_sort_by_creation_order() {
        let first = TraceId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = TraceId::generate();
        assert!(first.as_str() < second.as_str());
    }

    #[tokio::test]
    async fn current_reflects_scope() {
        let expected = TraceId::generate();
        let observed = TraceId::scope(expected.clone(), async move { TraceId::current() }).await;
        assert_eq!(observed, Some(expected));
    }

    #[test]
    fn sync_scope_exposes_identifier() {
        let expected = TraceId::generate();
        let observed = TraceId::sync_scope(expected.clone(), TraceId::current);
        assert_eq!(observed, Some(expected));
        assert!(TraceId::current().is_none());
    }

    #[tokio::test]
    async fn current_is_none_out_of_scope() {
        assert!(TraceId::current().is_none());
    }

    #[rstest]
    #[case("abc123")]
    #[case("  01J0Z8Q6M4X2  ")]
    #[case("00000000-0000-0000-0000-000000000000")]
    #[case("abc 123")]
    #[case("tr\u{e9}ce")]
    #[case("tab\tseparated")]
    fn parse_accepts_caller_values(#[case] raw: &str) {
        let trace_id = TraceId::parse(raw).expect("valid trace id");
        assert_eq!(trace_id.as_str(), raw.trim());
    }

    #[test]
    fn parse_accepts_long_values() {
        let raw = "a".repeat(512);
        let trace_id = TraceId::parse(&raw).expect("valid trace id");
        assert_eq!(trace_id.as_str().len(), 512);
    }

    #[rstest]
    #[case("", TraceIdError::Empty)]
    #[case("   ", TraceIdError::Empty)]
    #[case("abc\ndef", TraceIdError::InvalidCharacter)]
    #[case("abc\u{7f}", TraceIdError::InvalidCharacter)]
    fn parse_rejects_unusable_values(#[case] raw: &str, #[case] expected: TraceIdError) {
        assert_eq!(TraceId::parse(raw), Err(expected));
    }

    #[rstest]
    #[case(b"abc123".as_slice(), "abc123")]
    #[case(b"abc 123".as_slice(), "abc 123")]
    #[case(b"caf\xe9".as_slice(), "caf\u{fffd}")]
    fn from_inbound_echoes_supplied_header(#[case] raw: &[u8], #[case] expected: &str) {
        let trace_id = TraceId::from_inbound(Some(raw));
        assert_eq!(trace_id.as_str(), expected);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(b"".as_slice()))]
    #[case(Some(b"  ".as_slice()))]
    fn from_inbound_generates_when_absent_or_blank(#[case] inbound: Option<&[u8]>) {
        let trace_id = TraceId::from_inbound(inbound);
        assert!(Uuid::parse_str(trace_id.as_str()).is_ok());
    }
}
