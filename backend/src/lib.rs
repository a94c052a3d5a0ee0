//! Shared HTTP conventions for template services.
//!
//! The crate classifies use case failures into a uniform JSON error envelope,
//! stamps every request with a trace identifier, and provides the middleware,
//! probes, and outbound client a service built on it needs.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
