//! Domain primitives and ports.
//!
//! Purpose: Define transport-agnostic types shared by inbound and outbound
//! adapters. Keep this layer free of framework dependencies and document
//! invariants in each type's Rustdoc.
//!
//! Public surface:
//! - Failure (alias to `failure::Failure`) — closed taxonomy of use-case
//!   failures.
//! - ErrorCatalogue (alias to `error_catalogue::ErrorCatalogue`) — SQLSTATE
//!   lookup table injected at startup.
//! - TraceId / TenantId — request correlation identifiers.

pub mod error_catalogue;
pub mod failure;
pub mod ports;
pub mod tenant_id;
pub mod trace_id;

pub use self::error_catalogue::{CatalogueEntry, CatalogueError, ErrorCatalogue};
pub use self::failure::{
    entity_name, ErrorSource, ExternalIntegrationError, Failure, InvalidEntityError,
    ValidationDetails,
};
pub use self::tenant_id::{TenantId, CLIENT_ID_HEADER, TENANT_ID_HEADER};
pub use self::trace_id::{TraceId, TraceIdError, TRACE_ID_HEADER};
