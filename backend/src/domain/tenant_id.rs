//! Tenant identifier echoed from the caller's `client-id` header.

/// Header naming the calling client.
pub const CLIENT_ID_HEADER: &str = "client-id";

/// Header and log key under which the tenant is echoed back.
pub const TENANT_ID_HEADER: &str = "tenant_id";

/// Identifies the tenant a request is served for.
///
/// The value is taken verbatim from the inbound header. A missing header yields
/// an empty tenant rather than an error so anonymous probes keep working.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TenantId(String);

impl TenantId {
    /// Wrap the raw header value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the tenant as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the caller supplied no tenant.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
