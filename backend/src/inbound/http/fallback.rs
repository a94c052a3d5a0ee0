//! Catch-all handler for routes the service does not expose.

use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body returned for unrouted requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ForbiddenBody {
    /// Always `Forbidden`.
    #[schema(example = "Forbidden")]
    pub message: String,
}

/// Answer any unrouted request with 403 `{"message":"Forbidden"}`.
///
/// Register with [`actix_web::App::default_service`].
pub async fn forbidden() -> HttpResponse {
    HttpResponse::Forbidden().json(ForbiddenBody {
        message: "Forbidden".to_owned(),
    })
}
