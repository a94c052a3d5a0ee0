//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! specification for the HTTP surface. It registers:
//!
//! - **Paths**: the health probes exposed by the inbound layer
//! - **Schemas**: the error envelope ([`ErrorEnvelope`], [`ApiError`],
//!   [`ErrorDetail`]), the probe body ([`HealthStatus`]), and the catch-all
//!   body ([`ForbiddenBody`])
//!
//! The generated specification is used by Swagger UI (debug builds) and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use crate::inbound::http::envelope::{ApiError, ErrorDetail, ErrorEnvelope};
use crate::inbound::http::fallback::ForbiddenBody;
use crate::inbound::http::health::HealthStatus;
use utoipa::OpenApi;

/// OpenAPI document for the HTTP API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Template API",
        description = "Error envelope, tracing, and health probe conventions shared by every endpoint.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::health::health,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(ErrorEnvelope, ApiError, ErrorDetail, HealthStatus, ForbiddenBody)),
    tags(
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
