//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **http_client**: reqwest-backed [`crate::domain::ports::HttpRequester`]
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod http_client;
