//! Tower layer for rate limiting in Axum.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
};
use tower::{Layer, Service};

use crate::algorithm::Algorithm;
use crate::clock::Clock;
use crate::key::{HasHeaders, HasIpAddr, HasMethod, HasPath, Key};
use crate::middleware::{rate_limit_headers, LimiterOptions, LimiterOutcome, RateLimiter};
use crate::quota::Quota;
use crate::storage::Storage;

/// Tower layer for rate limiting.
pub struct RateLimitLayer<S, A, K, C> {
    limiter: Arc<RateLimiter<S, A, K, C>>,
}

impl<S, A, K, C> RateLimitLayer<S, A, K, C>
where
    S: Storage,
    A: Algorithm,
    C: Clock,
{
    /// Create a new rate limit layer.
    pub fn new(storage: S, algorithm: A, quota: Quota, key_extractor: K, clock: C) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::new(storage, algorithm, quota, key_extractor, clock)),
        }
    }

    /// Replace the default presentation options (message, status, headers).
    pub fn with_options(self, options: LimiterOptions) -> Self {
        let limiter = Arc::try_unwrap(self.limiter)
            .unwrap_or_else(|_| unreachable!("layer not yet shared across services"))
            .with_options(options);
        Self {
            limiter: Arc::new(limiter),
        }
    }
}

impl<S, A, K, C> Clone for RateLimitLayer<S, A, K, C> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
        }
    }
}

impl<S, A, K, C, Inner> Layer<Inner> for RateLimitLayer<S, A, K, C> {
    type Service = RateLimitService<S, A, K, C, Inner>;

    fn layer(&self, inner: Inner) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

/// The rate limiting service.
pub struct RateLimitService<S, A, K, C, Inner> {
    inner: Inner,
    limiter: Arc<RateLimiter<S, A, K, C>>,
}

impl<S, A, K, C, Inner: Clone> Clone for RateLimitService<S, A, K, C, Inner> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

/// Wrapper around an Axum request for key extraction.
pub struct AxumRequest<'a> {
    request: &'a Request<Body>,
}

impl<'a> AxumRequest<'a> {
    fn new(request: &'a Request<Body>) -> Self {
        Self { request }
    }
}

impl HasPath for AxumRequest<'_> {
    fn path(&self) -> &str {
        self.request.uri().path()
    }
}

impl HasMethod for AxumRequest<'_> {
    fn method(&self) -> &str {
        self.request.method().as_str()
    }
}

impl HasHeaders for AxumRequest<'_> {
    fn header(&self, name: &str) -> Option<&str> {
        self.request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
    }
}

impl HasIpAddr for AxumRequest<'_> {
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
            .extensions()
            .get::<std::net::SocketAddr>()
            .map(|addr| addr.ip())
    }
}

impl<S, A, K, C, Inner> Service<Request<Body>> for RateLimitService<S, A, K, C, Inner>
where
    S: Storage,
    A: Algorithm,
    K: for<'a> Key<AxumRequest<'a>>,
    C: Clock,
    Inner: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    Inner::Future: Send,
{
    type Response = Response<Body>;
    type Error = Inner::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let limiter = self.limiter.clone();
        let mut inner = self.inner.clone();

        // The key extractor only needs a borrow of the request, so we
        // extract it up front, before `request` moves into the async block.
        let extracted_key = limiter.extract_key(&AxumRequest::new(&request));

        Box::pin(async move {
            let headers_enabled = limiter.options().headers_enabled();
            let status_code = limiter.options().status_code();

            match limiter.check_and_record_key(&extracted_key).await {
                LimiterOutcome::Decided(decision) => {
                    if decision.is_allowed() {
                        let response = inner.call(request).await?;
                        Ok(apply_headers(response, &decision, headers_enabled))
                    } else {
                        let body = limiter.rejection_body(&decision);
                        Ok(rejection_response(&decision, &body, status_code, headers_enabled))
                    }
                }
                LimiterOutcome::FailOpen => inner.call(request).await,
            }
        })
    }
}

fn apply_headers(
    mut response: Response<Body>,
    decision: &crate::decision::Decision,
    headers_enabled: bool,
) -> Response<Body> {
    if headers_enabled {
        let headers = response.headers_mut();
        for (name, value) in rate_limit_headers(decision) {
            if let Ok(header_value) = value.parse() {
                headers.insert(name, header_value);
            }
        }
    }
    response
}

fn rejection_response(
    decision: &crate::decision::Decision,
    body: &crate::middleware::RejectionBody,
    status_code: u16,
    headers_enabled: bool,
) -> Response<Body> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    let mut response = Response::new(Body::from(json));
    *response.status_mut() =
        StatusCode::from_u16(status_code).unwrap_or(StatusCode::TOO_MANY_REQUESTS);

    let headers = response.headers_mut();
    headers.insert("content-type", "application/json".parse().unwrap());

    if headers_enabled {
        for (name, value) in rate_limit_headers(decision) {
            if let Ok(header_value) = value.parse() {
                headers.insert(name, header_value);
            }
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::FixedWindow;
    use crate::clock::SystemClock;
    use crate::key::GlobalKey;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_layer_creation() {
        let layer = RateLimitLayer::new(
            MemoryStorage::new(),
            FixedWindow::new(),
            Quota::per_second(10),
            GlobalKey::new(),
            SystemClock::new(),
        );

        assert_eq!(layer.limiter.options().status_code(), 429);
    }
}
