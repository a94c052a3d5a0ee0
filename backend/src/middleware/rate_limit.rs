//! Per-client request quota keyed by peer IP.

use std::net::IpAddr;
use std::num::NonZeroU32;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, Error};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tracing::warn;

use crate::domain::Failure;
use crate::inbound::http::context::RequestContext;
use crate::inbound::http::response::ResponseAdapter;

/// Invalid quota settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    /// `max` was zero.
    #[error("rate limit must admit at least one request per window")]
    ZeroMax,
    /// The window is too short to spread `max` requests over.
    #[error("rate limit window must be positive")]
    ZeroWindow,
}

/// Rejects callers that exceed `max` requests per `window` with a 429
/// envelope and a `Retry-After` header.
///
/// The limiter state is shared by every worker that clones this value. A
/// [`RateLimit::disabled`] layer admits everything.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use actix_web::App;
/// use template_api::middleware::RateLimit;
///
/// let limit = RateLimit::new(100, Duration::from_secs(60)).expect("valid quota");
/// let app = App::new().wrap(limit);
/// ```
#[derive(Clone)]
pub struct RateLimit {
    limiter: Option<Arc<DefaultKeyedRateLimiter<IpAddr>>>,
}

impl std::fmt::Debug for RateLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimit")
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

impl RateLimit {
    /// Admit `max` requests per `window`, replenishing evenly.
    ///
    /// # Errors
    /// Returns [`RateLimitError`] when `max` is zero or `window` is too
    /// short to hold `max` requests.
    pub fn new(max: u32, window: Duration) -> Result<Self, RateLimitError> {
        let burst = NonZeroU32::new(max).ok_or(RateLimitError::ZeroMax)?;
        let quota = Quota::with_period(window / max)
            .ok_or(RateLimitError::ZeroWindow)?
            .allow_burst(burst);
        Ok(Self {
            limiter: Some(Arc::new(RateLimiter::keyed(quota))),
        })
    }

    /// Layer that never rejects.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { limiter: None }
    }

    /// Whether requests are counted at all.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Seconds until `key` may retry, or `None` when the request is admitted.
    fn check(&self, key: IpAddr) -> Option<u64> {
        let limiter = self.limiter.as_ref()?;
        limiter.check_key(&key).err().map(|not_until| {
            let wait = not_until.wait_time_from(DefaultClock::default().now());
            wait.as_secs() + u64::from(wait.subsec_nanos() > 0)
        })
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service,
            limit: Rc::new(self.clone()),
        }))
    }
}

/// Service wrapper produced by [`RateLimit`].
pub struct RateLimitMiddleware<S> {
    service: S,
    limit: Rc<RateLimit>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let retry_after = req
            .peer_addr()
            .and_then(|addr| self.limit.check(addr.ip()));
        let Some(retry_after_secs) = retry_after else {
            let fut = self.service.call(req);
            return Box::pin(async move { Ok(fut.await?.map_into_left_body()) });
        };

        warn!(
            peer = ?req.peer_addr(),
            retry_after_secs,
            "rate limit exceeded"
        );
        let adapter = req
            .app_data::<web::Data<ResponseAdapter>>()
            .map(|data| data.get_ref().clone())
            .unwrap_or_default();
        let context = RequestContext::from_request(req.request());
        let response =
            adapter.failure_response(&Failure::RateLimited { retry_after_secs }, &context);
        Box::pin(ready(Ok(req.into_response(response).map_into_right_body())))
    }
}
