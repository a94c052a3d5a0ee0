//! Driven port for calling downstream HTTP services.
//!
//! Use cases depend on this port instead of a concrete client so they can be
//! exercised without network access. Every downstream failure surfaces as a
//! [`Failure::ExternalIntegration`], which the inbound adapter knows how to
//! render.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::domain::Failure;

/// Successful downstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrationResponse {
    /// HTTP status returned by the downstream service.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl IntegrationResponse {
    /// Decode the body as JSON.
    ///
    /// # Errors
    /// Returns [`Failure::Unknown`] wrapping the decode error when the body
    /// does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Failure> {
        serde_json::from_slice(&self.body).map_err(Failure::unknown)
    }
}

/// Port for issuing JSON requests against one downstream base URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpRequester: Send + Sync {
    /// Issue a `GET` for `endpoint`, relative to the configured base URL.
    async fn get(&self, endpoint: &str) -> Result<IntegrationResponse, Failure>;

    /// Issue a `POST` with a JSON body.
    async fn post(&self, endpoint: &str, body: Vec<u8>) -> Result<IntegrationResponse, Failure>;

    /// Issue a `PUT` with a JSON body.
    async fn put(&self, endpoint: &str, body: Vec<u8>) -> Result<IntegrationResponse, Failure>;

    /// Issue a `DELETE`.
    async fn delete(&self, endpoint: &str) -> Result<IntegrationResponse, Failure>;
}

/// Fixture requester answering every call with `200 {}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureHttpRequester;

impl FixtureHttpRequester {
    fn ok() -> IntegrationResponse {
        IntegrationResponse {
            status: 200,
            body: b"{}".to_vec(),
        }
    }
}

#[async_trait]
impl HttpRequester for FixtureHttpRequester {
    async fn get(&self, _endpoint: &str) -> Result<IntegrationResponse, Failure> {
        Ok(Self::ok())
    }

    async fn post(&self, _endpoint: &str, _body: Vec<u8>) -> Result<IntegrationResponse, Failure> {
        Ok(Self::ok())
    }

    async fn put(&self, _endpoint: &str, _body: Vec<u8>) -> Result<IntegrationResponse, Failure> {
        Ok(Self::ok())
    }

    async fn delete(&self, _endpoint: &str) -> Result<IntegrationResponse, Failure> {
        Ok(Self::ok())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ExternalIntegrationError;
    use rstest::rstest;
    use serde_json::Value;

    #[rstest]
    #[tokio::test]
    async fn fixture_answers_with_empty_object() {
        let response = FixtureHttpRequester.get("/anything").await.expect("fixture ok");
        assert_eq!(response.status, 200);
        let body: Value = response.json().expect("json body");
        assert_eq!(body, serde_json::json!({}));
    }

    #[rstest]
    #[tokio::test]
    async fn downstream_failures_surface_as_integration_errors() {
        let mut requester = MockHttpRequester::new();
        requester
            .expect_post()
            .withf(|endpoint, body| endpoint == "/orders" && body.as_slice() == b"{}")
            .times(1)
            .returning(|_, _| {
                Err(ExternalIntegrationError::new(429, br#"{"error":{}}"#.to_vec()).into())
            });

        let result = requester.post("/orders", b"{}".to_vec()).await;
        match result {
            Err(Failure::ExternalIntegration(err)) => assert_eq!(err.code, 429),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn json_decode_failure_is_unknown() {
        let response = IntegrationResponse {
            status: 200,
            body: b"not json".to_vec(),
        };
        let result: Result<Value, Failure> = response.json();
        assert!(matches!(result, Err(Failure::Unknown(_))));
    }
}
