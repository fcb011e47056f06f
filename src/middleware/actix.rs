//! Actix-web middleware for rate limiting.
//!
//! Provides middleware for integrating rate limiting into Actix-web applications.
//!
//! # Example
//!
//! ```ignore
//! use actix_web::{web, App, HttpServer};
//! use ratelimit_core::{
//!     middleware::actix::RateLimiterMiddlewareFactory,
//!     key::IpKey,
//!     TokenBucket, Quota, MemoryStorage, SystemClock,
//! };
//!
//! #[actix_web::main]
//! async fn main() {
//!     let storage = MemoryStorage::new();
//!
//!     HttpServer::new(move || {
//!         App::new()
//!             .wrap(RateLimiterMiddlewareFactory::new(
//!                 storage.clone(),
//!                 TokenBucket::new(),
//!                 Quota::per_second(10),
//!                 IpKey::new(),
//!                 SystemClock::new(),
//!             ))
//!             .route("/api/data", web::get().to(handler))
//!     })
//!     .bind("127.0.0.1:8080")?
//!     .run()
//!     .await
//! }
//! ```

use std::future::{ready, Future, Ready};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_service::{Service, Transform};
use actix_web::{
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
    Error, HttpResponse,
};

use crate::algorithm::Algorithm;
use crate::clock::Clock;
use crate::key::{HasHeaders, HasIpAddr, HasMethod, HasPath, Key};
use crate::middleware::{rate_limit_headers, LimiterOptions, LimiterOutcome, RateLimiter};
use crate::quota::Quota;
use crate::storage::Storage;

/// Actix-web middleware factory: wraps an app (or scope) with a `RateLimiter`.
///
/// Named `RateLimiterMiddlewareFactory` (rather than `RateLimiter`, which
/// would collide with `middleware::RateLimiter`) since `actix_web::App::wrap`
/// takes a `Transform`, not the limiter core directly.
pub struct RateLimiterMiddlewareFactory<S, A, K, C> {
    limiter: Arc<RateLimiter<S, A, K, C>>,
}

impl<S, A, K, C> RateLimiterMiddlewareFactory<S, A, K, C>
where
    S: Storage,
    A: Algorithm,
    C: Clock,
{
    /// Create a new rate limiter middleware factory.
    pub fn new(storage: S, algorithm: A, quota: Quota, key_extractor: K, clock: C) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::new(storage, algorithm, quota, key_extractor, clock)),
        }
    }

    /// Replace the default presentation options (message, status, headers).
    pub fn with_options(self, options: LimiterOptions) -> Self {
        let limiter = Arc::try_unwrap(self.limiter)
            .unwrap_or_else(|_| unreachable!("factory not yet shared across apps"))
            .with_options(options);
        Self {
            limiter: Arc::new(limiter),
        }
    }
}

impl<S, A, K, C> Clone for RateLimiterMiddlewareFactory<S, A, K, C> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
        }
    }
}

/// A borrowed view over an Actix `ServiceRequest` for key extraction.
pub struct ActixRequest<'a> {
    request: &'a ServiceRequest,
}

impl<'a> ActixRequest<'a> {
    fn new(request: &'a ServiceRequest) -> Self {
        Self { request }
    }
}

impl HasPath for ActixRequest<'_> {
    fn path(&self) -> &str {
        self.request.path()
    }
}

impl HasMethod for ActixRequest<'_> {
    fn method(&self) -> &str {
        self.request.method().as_str()
    }
}

impl HasHeaders for ActixRequest<'_> {
    fn header(&self, name: &str) -> Option<&str> {
        self.request.headers().get(name).and_then(|v| v.to_str().ok())
    }
}

impl HasIpAddr for ActixRequest<'_> {
    fn client_ip(&self) -> Option<std::net::IpAddr> {
        if let Some(forwarded) = self.header("x-forwarded-for") {
            if let Some(first) = forwarded.split(',').next() {
                if let Ok(ip) = first.trim().parse() {
                    return Some(ip);
                }
            }
        }
        if let Some(real_ip) = self.header("x-real-ip") {
            if let Ok(ip) = real_ip.parse() {
                return Some(ip);
            }
        }
        self.request
            .connection_info()
            .peer_addr()
            .and_then(|addr| addr.parse().ok())
    }
}

impl<S, A, K, C, Svc, B> Transform<Svc, ServiceRequest> for RateLimiterMiddlewareFactory<S, A, K, C>
where
    S: Storage,
    A: Algorithm,
    K: for<'a> Key<ActixRequest<'a>>,
    C: Clock,
    Svc: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    Svc::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimiterMiddleware<S, A, K, C, Svc>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: Svc) -> Self::Future {
        ready(Ok(RateLimiterMiddleware {
            service,
            limiter: self.limiter.clone(),
        }))
    }
}

/// The actual middleware service.
pub struct RateLimiterMiddleware<S, A, K, C, Svc> {
    service: Svc,
    limiter: Arc<RateLimiter<S, A, K, C>>,
}

impl<S, A, K, C, Svc, B> Service<ServiceRequest> for RateLimiterMiddleware<S, A, K, C, Svc>
where
    S: Storage,
    A: Algorithm,
    K: for<'a> Key<ActixRequest<'a>>,
    C: Clock,
    Svc: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    Svc::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let limiter = self.limiter.clone();

        // Extract the key before `req` is consumed by the inner service.
        let key = limiter.extract_key(&ActixRequest::new(&req));
        let fut = self.service.call(req);

        Box::pin(async move {
            match limiter.check_and_record_key(&key).await {
                LimiterOutcome::Decided(decision) if decision.is_denied() => {
                    let body = limiter.rejection_body(&decision);
                    let json = serde_json::to_string(&body).unwrap_or_else(|_| "{}".to_string());
                    let status = StatusCode::from_u16(limiter.options().status_code())
                        .unwrap_or(StatusCode::TOO_MANY_REQUESTS);

                    let mut builder = HttpResponse::build(status);
                    builder.insert_header(("Content-Type", "application/json"));
                    if limiter.options().headers_enabled() {
                        for (name, value) in rate_limit_headers(&decision) {
                            builder.insert_header((name, value));
                        }
                    }
                    let response = builder.body(json);

                    Err(actix_web::error::InternalError::from_response("rate limited", response).into())
                }
                LimiterOutcome::Decided(decision) => {
                    let res = fut.await?;
                    let mut res = res.map_into_left_body();
                    if limiter.options().headers_enabled() {
                        let headers = res.headers_mut();
                        for (name, value) in rate_limit_headers(&decision) {
                            if let (Ok(header_name), Ok(header_value)) = (
                                actix_web::http::header::HeaderName::from_bytes(name.as_bytes()),
                                actix_web::http::header::HeaderValue::from_str(&value),
                            ) {
                                headers.insert(header_name, header_value);
                            }
                        }
                    }
                    Ok(res)
                }
                LimiterOutcome::FailOpen => {
                    let res = fut.await?;
                    Ok(res.map_into_left_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::FixedWindow;
    use crate::clock::SystemClock;
    use crate::key::IpKey;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_factory_creation() {
        let factory = RateLimiterMiddlewareFactory::new(
            MemoryStorage::new(),
            FixedWindow::new(),
            Quota::per_second(10),
            IpKey::new(),
            SystemClock::new(),
        );

        assert_eq!(factory.limiter.options().status_code(), 429);
    }
}
