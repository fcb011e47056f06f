//! Request-interception middleware core, plus framework adapters.
//!
//! `RateLimiter<S, A, K, C>` is the framework-agnostic piece: it derives a
//! client key, consults the algorithm, updates [`Stats`](crate::stats::Stats),
//! and produces either an allowed/denied [`Decision`] or tells the caller to
//! fail open. [`RateLimitLayer`] (Tower/Axum, `axum` feature) and
//! `actix::RateLimitMiddleware` (`actix` feature) adapt this core onto their
//! respective request/response types.
//!
//! # Example
//!
//! ```ignore
//! use ratelimit_core::{
//!     middleware::RateLimiter,
//!     key::IpKey,
//!     Quota, MemoryStorage, TokenBucket, SystemClock,
//! };
//!
//! let limiter = RateLimiter::new(
//!     MemoryStorage::new(),
//!     TokenBucket::new(),
//!     Quota::per_second(10),
//!     IpKey::new(),
//!     SystemClock::new(),
//! );
//! ```

#[cfg(feature = "axum")]
mod layer;

#[cfg(feature = "actix")]
pub mod actix;

#[cfg(feature = "axum")]
pub use layer::RateLimitLayer;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::algorithm::Algorithm;
use crate::clock::Clock;
use crate::decision::Decision;
use crate::key::Key;
use crate::quota::Quota;
use crate::stats::Stats;
use crate::storage::Storage;

/// Presentation options for the middleware: the rejection message, status
/// code, and whether to emit `X-RateLimit-*`/`Retry-After` headers at all.
///
/// Distinct from [`Quota`]: the quota is the algorithm's contract, these are
/// how the middleware presents a denial to the client.
#[derive(Debug, Clone)]
pub struct LimiterOptions {
    message: String,
    status_code: u16,
    headers_enabled: bool,
}

impl Default for LimiterOptions {
    fn default() -> Self {
        Self {
            message: "Too Many Requests".to_string(),
            status_code: 429,
            headers_enabled: true,
        }
    }
}

impl LimiterOptions {
    /// Create the default options: canned message, 429, headers on.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom rejection message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the status code used for a rejection (default 429).
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    /// Enable or disable `X-RateLimit-*`/`Retry-After` headers.
    pub fn with_headers_enabled(mut self, enabled: bool) -> Self {
        self.headers_enabled = enabled;
        self
    }

    /// The configured rejection message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The configured rejection status code.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Whether rate limit headers should be emitted.
    pub fn headers_enabled(&self) -> bool {
        self.headers_enabled
    }
}

/// The JSON body of a 429 rejection response:
/// `{ "error", "retryAfter", "limit", "remaining", "resetTime" }`, with
/// `resetTime` an ISO-8601 UTC timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectionBody {
    /// Human-readable rejection message.
    pub error: String,
    /// Seconds the client should wait before retrying.
    #[serde(rename = "retryAfter")]
    pub retry_after: u64,
    /// Effective capacity reported to the client.
    pub limit: u64,
    /// Always `0` on a rejection.
    pub remaining: u64,
    /// ISO-8601 UTC timestamp at which the client regains capacity.
    #[serde(rename = "resetTime")]
    pub reset_time: String,
}

impl RejectionBody {
    fn from_decision(decision: &Decision, message: &str) -> Self {
        let info = decision.info();
        let retry_after = info.retry_after_seconds().unwrap_or(1).max(1);

        Self {
            error: message.to_string(),
            retry_after,
            limit: info.limit,
            remaining: 0,
            reset_time: reset_time_iso8601(info.reset_at),
        }
    }
}

/// Format a Unix-seconds timestamp as an ISO-8601 UTC string.
fn reset_time_iso8601(reset_at_unix_seconds: u64) -> String {
    chrono::DateTime::from_timestamp(reset_at_unix_seconds as i64, 0)
        .unwrap_or_else(|| chrono::DateTime::from_timestamp(0, 0).unwrap())
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// The standard rate limit headers for a decision: `X-RateLimit-Limit`,
/// `-Remaining`, `-Reset` always, plus `Retry-After` when the decision
/// carries one (denials).
pub fn rate_limit_headers(decision: &Decision) -> Vec<(&'static str, String)> {
    let info = decision.info();
    let mut headers = vec![
        ("X-RateLimit-Limit", info.limit.to_string()),
        ("X-RateLimit-Remaining", info.remaining.to_string()),
        ("X-RateLimit-Reset", info.reset_at.to_string()),
    ];
    if let Some(retry_after) = info.retry_after_seconds() {
        headers.push(("Retry-After", retry_after.max(1).to_string()));
    }
    headers
}

/// What the middleware should do with a checked request.
pub enum LimiterOutcome {
    /// The algorithm produced a decision; forward or reject per
    /// `Decision::is_allowed()` and attach `rate_limit_headers` if enabled.
    Decided(Decision),
    /// The storage backend failed; forward the request with no headers and
    /// no stats update (fail-open).
    FailOpen,
}

/// Framework-agnostic rate limiting core: derive a key, check the algorithm,
/// update stats, and report what to do with the request.
///
/// Generic over the storage backend `S`, the algorithm `A`, the key
/// extractor `K`, and the clock `C` so the embedder assembles exactly the
/// stack it needs at compile time.
pub struct RateLimiter<S, A, K, C> {
    storage: Arc<S>,
    algorithm: A,
    quota: Quota,
    key_extractor: K,
    clock: C,
    options: LimiterOptions,
    stats: Arc<Stats>,
}

impl<S, A, K, C> RateLimiter<S, A, K, C>
where
    S: Storage,
    A: Algorithm,
    C: Clock,
{
    /// Build a rate limiter from its storage backend, algorithm, quota, key
    /// extractor, and clock, with default presentation options.
    pub fn new(storage: S, algorithm: A, quota: Quota, key_extractor: K, clock: C) -> Self {
        Self {
            storage: Arc::new(storage),
            algorithm,
            quota,
            key_extractor,
            clock,
            options: LimiterOptions::default(),
            stats: Arc::new(Stats::new()),
        }
    }

    /// Replace the default presentation options.
    pub fn with_options(mut self, options: LimiterOptions) -> Self {
        self.options = options;
        self
    }

    /// Share an existing `Stats` aggregator instead of creating a fresh one
    /// (e.g. to expose one stats snapshot across several limiters/routes).
    pub fn with_stats(mut self, stats: Arc<Stats>) -> Self {
        self.stats = stats;
        self
    }

    /// The configured presentation options.
    pub fn options(&self) -> &LimiterOptions {
        &self.options
    }

    /// A handle to this limiter's stats aggregator.
    pub fn stats(&self) -> Arc<Stats> {
        self.stats.clone()
    }

    /// Run the operational sequence against an arbitrary request: derive the
    /// key, register it for cardinality, check the algorithm, and update
    /// stats. Never writes headers or a response body directly — that's the
    /// framework adapter's job, since it owns the response type.
    pub async fn check_and_record<R>(&self, request: &R) -> LimiterOutcome
    where
        K: Key<R>,
    {
        let key = self.extract_key(request);
        self.check_and_record_key(&key).await
    }

    /// Derive the client key for a request without performing the check.
    ///
    /// Exposed so framework adapters whose request type can't be moved into
    /// an `async move` block by reference (e.g. Axum's `Request<Body>`) can
    /// extract the key synchronously up front, then pass it to
    /// `check_and_record_key` once the request has been consumed.
    pub fn extract_key<R>(&self, request: &R) -> String
    where
        K: Key<R>,
    {
        self.key_extractor
            .extract(request)
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Run the operational sequence against an already-extracted key.
    ///
    /// Useful for framework adapters that must extract the key from a
    /// borrowed request before moving an owned request into an async block
    /// (the key extractor borrows the request; the request itself typically
    /// does not live long enough to cross the `async move`).
    pub async fn check_and_record_key(&self, key: &str) -> LimiterOutcome {
        self.stats.observe_key(key);

        let now_ms = self.clock.now_ms();
        match self
            .algorithm
            .check_and_record(&*self.storage, &key, &self.quota, now_ms)
            .await
        {
            Ok(decision) => {
                self.stats
                    .record(self.algorithm.name(), decision.is_allowed());
                LimiterOutcome::Decided(decision)
            }
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    key = %key,
                    "rate limiter storage failure, failing open"
                );
                LimiterOutcome::FailOpen
            }
        }
    }

    /// Build the rejection body for a denied decision, using the configured
    /// message.
    pub fn rejection_body(&self, decision: &Decision) -> RejectionBody {
        RejectionBody::from_decision(decision, &self.options.message)
    }

    /// Reset this limiter's in-memory stats and ask the backend to drop all
    /// rate-limit state it holds.
    pub async fn reset(&self) -> crate::error::Result<()> {
        self.stats.reset();
        self.storage.reset_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::FixedWindow;
    use crate::clock::TestClock;
    use crate::key::StaticKey;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn test_check_and_record_allowed_updates_stats() {
        let limiter = RateLimiter::new(
            MemoryStorage::new(),
            FixedWindow::new(),
            Quota::per_minute(5),
            StaticKey::new("user:1"),
            TestClock::new(0),
        );

        match limiter.check_and_record(&()).await {
            LimiterOutcome::Decided(decision) => assert!(decision.is_allowed()),
            LimiterOutcome::FailOpen => panic!("expected a decision"),
        }

        let snapshot = limiter.stats().snapshot();
        assert_eq!(snapshot.total_requests, 1);
        assert_eq!(snapshot.allowed_requests, 1);
        assert_eq!(snapshot.unique_keys, 1);
    }

    #[tokio::test]
    async fn test_check_and_record_denies_past_limit() {
        let limiter = RateLimiter::new(
            MemoryStorage::new(),
            FixedWindow::new(),
            Quota::per_minute(1),
            StaticKey::new("user:1"),
            TestClock::new(0),
        );

        let _ = limiter.check_and_record(&()).await;
        match limiter.check_and_record(&()).await {
            LimiterOutcome::Decided(decision) => {
                assert!(decision.is_denied());
                let body = limiter.rejection_body(&decision);
                assert_eq!(body.remaining, 0);
                assert!(body.retry_after >= 1);
            }
            LimiterOutcome::FailOpen => panic!("expected a decision"),
        }
    }

    #[test]
    fn test_rate_limit_headers_include_retry_after_only_when_denied() {
        use crate::decision::RateLimitInfo;

        let allowed = Decision::allowed(RateLimitInfo::new(10, 9, 60, 1));
        let headers = rate_limit_headers(&allowed);
        assert!(!headers.iter().any(|(k, _)| *k == "Retry-After"));

        let denied = Decision::denied(
            RateLimitInfo::new(10, 0, 60, 10).with_retry_after(std::time::Duration::from_secs(5)),
        );
        let headers = rate_limit_headers(&denied);
        assert!(headers.iter().any(|(k, v)| *k == "Retry-After" && v == "5"));
    }

    #[test]
    fn test_rejection_body_reset_time_is_iso8601() {
        use crate::decision::RateLimitInfo;

        let decision = Decision::denied(
            RateLimitInfo::new(10, 0, 1_700_000_060, 10)
                .with_retry_after(std::time::Duration::from_secs(30)),
        );
        let body = RejectionBody::from_decision(&decision, "slow down");
        assert_eq!(body.error, "slow down");
        assert_eq!(body.retry_after, 30);
        assert!(body.reset_time.contains('T'));
        assert!(body.reset_time.ends_with('Z'));
    }
}
