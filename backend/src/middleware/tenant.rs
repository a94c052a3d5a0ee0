//! Tenant middleware echoing the caller's `client-id` as `tenant_id`.

use std::task::{Context, Poll};

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{Error, HttpMessage};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use tracing::warn;

use crate::domain::{TenantId, CLIENT_ID_HEADER, TENANT_ID_HEADER};
use crate::inbound::http::health::HEALTH_PATH;

/// Copies `client-id` into a [`TenantId`] request extension and the
/// `tenant_id` response header.
///
/// A missing header yields an empty tenant. Requests to `/health` pass
/// through untouched.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use template_api::middleware::Tenant;
///
/// let app = App::new().wrap(Tenant);
/// ```
#[derive(Clone)]
pub struct Tenant;

impl<S, B> Transform<S, ServiceRequest> for Tenant
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TenantMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TenantMiddleware { service }))
    }
}

/// Service wrapper produced by [`Tenant`].
pub struct TenantMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for TenantMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if req.path() == HEALTH_PATH {
            return Box::pin(self.service.call(req));
        }

        let tenant = TenantId::new(
            req.headers()
                .get(CLIENT_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default(),
        );
        req.extensions_mut().insert(tenant.clone());
        let fut = self.service.call(req);
        Box::pin(async move {
            let mut res = fut.await?;
            match HeaderValue::from_str(tenant.as_str()) {
                Ok(value) => {
                    res.response_mut()
                        .headers_mut()
                        .insert(HeaderName::from_static(TENANT_ID_HEADER), value);
                }
                Err(error) => warn!(%error, "failed to encode tenant header"),
            }
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use actix_web::test as actix_test;
    use actix_web::{web, App, HttpRequest, HttpResponse};

    async fn echo_tenant(req: HttpRequest) -> HttpResponse {
        let tenant = req.extensions().get::<TenantId>().cloned().unwrap_or_default();
        HttpResponse::Ok().body(tenant.to_string())
    }

    #[actix_web::test]
    async fn echoes_client_id() {
        let app = actix_test::init_service(App::new().wrap(Tenant).route("/", web::get().to(echo_tenant))).await;
        let req = actix_test::TestRequest::get()
            .uri("/")
            .insert_header((CLIENT_ID_HEADER, "acme"))
            .to_request();
        let res = actix_test::call_service(&app, req).await;

        assert_eq!(
            res.headers().get(TENANT_ID_HEADER).and_then(|v| v.to_str().ok()),
            Some("acme")
        );
        let body = actix_test::read_body(res).await;
        assert_eq!(body.as_ref(), b"acme");
    }

    #[actix_web::test]
    async fn missing_client_id_yields_empty_tenant() {
        let app = actix_test::init_service(App::new().wrap(Tenant).route("/", web::get().to(echo_tenant))).await;
        let res = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/").to_request()).await;

        assert_eq!(
            res.headers().get(TENANT_ID_HEADER).and_then(|v| v.to_str().ok()),
            Some("")
        );
        assert!(actix_test::read_body(res).await.is_empty());
    }

    #[actix_web::test]
    async fn skips_health_path() {
        let app = actix_test::init_service(
            App::new()
                .wrap(Tenant)
                .route(HEALTH_PATH, web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let req = actix_test::TestRequest::get()
            .uri(HEALTH_PATH)
            .insert_header((CLIENT_ID_HEADER, "acme"))
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert!(!res.headers().contains_key(TENANT_ID_HEADER));
    }
}
