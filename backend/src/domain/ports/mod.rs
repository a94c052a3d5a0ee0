//! Domain ports and supporting types for the hexagonal boundary.

mod http_requester;

#[cfg(test)]
pub use http_requester::MockHttpRequester;
pub use http_requester::{FixtureHttpRequester, HttpRequester, IntegrationResponse};
