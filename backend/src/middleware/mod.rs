//! Request middleware.
//!
//! Purpose: Define middleware components for request lifecycle concerns:
//! trace and tenant stamping, media type guarding, access logging, and rate
//! limiting. Each layer is independent and can be wrapped on its own.

pub mod content_type;
pub mod rate_limit;
pub mod request_log;
pub mod tenant;
pub mod trace;

pub use content_type::ContentTypeGuard;
pub use rate_limit::{RateLimit, RateLimitError};
pub use request_log::RequestLog;
pub use tenant::Tenant;
pub use trace::Trace;
