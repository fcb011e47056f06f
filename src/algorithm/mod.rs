//! Rate limiting algorithm trait and implementations.
//!
//! This module defines the `Algorithm` trait and provides the five decision
//! procedures built on top of it.
//!
//! # Available Algorithms
//!
//! - **Token Bucket** (`token-bucket` feature, default): controlled bursts with
//!   discrete refilling.
//! - **Leaking Bucket** (`leaking-bucket` feature, default): FIFO queue drained at
//!   a constant processing rate.
//! - **Fixed Window** (`fixed-window` feature, default): simple counter per
//!   window-aligned bucket.
//! - **Sliding Window Log** (`sliding-log` feature, default): exact count over the
//!   trailing window, one timestamp per request.
//! - **Sliding Window Counter** (`sliding-window-counter` feature, default):
//!   weighted blend of the current and previous window's counts.

#[cfg(feature = "leaking-bucket")]
mod leaky_bucket;
#[cfg(feature = "sliding-log")]
mod sliding_log;
#[cfg(feature = "fixed-window")]
mod fixed_window;
#[cfg(feature = "sliding-window-counter")]
mod sliding_window;
#[cfg(feature = "token-bucket")]
mod token_bucket;

#[cfg(feature = "leaking-bucket")]
pub use leaky_bucket::LeakingBucket;
#[cfg(feature = "sliding-log")]
pub use sliding_log::SlidingWindowLog;
#[cfg(feature = "fixed-window")]
pub use fixed_window::FixedWindow;
#[cfg(feature = "sliding-window-counter")]
pub use sliding_window::SlidingWindowCounter;
#[cfg(feature = "token-bucket")]
pub use token_bucket::TokenBucket;

use std::future::Future;

use crate::decision::Decision;
use crate::error::Result;
use crate::quota::Quota;
use crate::storage::Storage;

/// Rate limiting algorithm trait.
///
/// Each algorithm provides different trade-offs between accuracy, memory usage,
/// and burst handling. All implementations must be thread-safe. `now_ms` is
/// always supplied by the caller (never read from the system clock directly),
/// so an algorithm's behavior is fully deterministic given its inputs.
///
/// # Algorithm Comparison
///
/// | Algorithm | Accuracy | Memory | Burst | Best For |
/// |-----------|----------|--------|-------|----------|
/// | Token Bucket | High | Low | Excellent | Bursty traffic |
/// | Leaking Bucket | High | Medium (queue) | None | Smooth output |
/// | Fixed Window | Low | Low | Poor | Simple use cases |
/// | Sliding Window Log | Highest | High | Good | Precision critical |
/// | Sliding Window Counter | Medium | Low | Good | General purpose |
pub trait Algorithm: Send + Sync + 'static {
    /// Get the algorithm name (for logging/metrics).
    fn name(&self) -> &'static str;

    /// Check if a request is allowed AND record it atomically.
    ///
    /// This is the primary method for rate limiting. It checks whether the
    /// request should be allowed and, if so, records it against the quota.
    fn check_and_record<S: Storage>(
        &self,
        storage: &S,
        key: &str,
        quota: &Quota,
        now_ms: u64,
    ) -> impl Future<Output = Result<Decision>> + Send;

    /// Check without recording (peek at current state).
    ///
    /// Useful for displaying rate limit info without consuming quota.
    fn check<S: Storage>(
        &self,
        storage: &S,
        key: &str,
        quota: &Quota,
        now_ms: u64,
    ) -> impl Future<Output = Result<Decision>> + Send;

    /// Reset the rate limit for a key.
    fn reset<S: Storage>(&self, storage: &S, key: &str) -> impl Future<Output = Result<()>> + Send {
        async move { storage.delete(key).await }
    }
}

/// A runtime-selectable algorithm, so a limiter can be constructed from a
/// configuration value (e.g. a string naming the algorithm) instead of a
/// compile-time type parameter.
#[derive(Debug, Clone, Copy)]
pub enum AnyAlgorithm {
    /// Token bucket.
    #[cfg(feature = "token-bucket")]
    TokenBucket(TokenBucket),
    /// Leaking bucket.
    #[cfg(feature = "leaking-bucket")]
    LeakingBucket(LeakingBucket),
    /// Fixed window.
    #[cfg(feature = "fixed-window")]
    FixedWindow(FixedWindow),
    /// Sliding window log.
    #[cfg(feature = "sliding-log")]
    SlidingWindowLog(SlidingWindowLog),
    /// Sliding window counter.
    #[cfg(feature = "sliding-window-counter")]
    SlidingWindowCounter(SlidingWindowCounter),
}

impl Algorithm for AnyAlgorithm {
    fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "token-bucket")]
            Self::TokenBucket(a) => a.name(),
            #[cfg(feature = "leaking-bucket")]
            Self::LeakingBucket(a) => a.name(),
            #[cfg(feature = "fixed-window")]
            Self::FixedWindow(a) => a.name(),
            #[cfg(feature = "sliding-log")]
            Self::SlidingWindowLog(a) => a.name(),
            #[cfg(feature = "sliding-window-counter")]
            Self::SlidingWindowCounter(a) => a.name(),
        }
    }

    async fn check_and_record<S: Storage>(
        &self,
        storage: &S,
        key: &str,
        quota: &Quota,
        now_ms: u64,
    ) -> Result<Decision> {
        match self {
            #[cfg(feature = "token-bucket")]
            Self::TokenBucket(a) => a.check_and_record(storage, key, quota, now_ms).await,
            #[cfg(feature = "leaking-bucket")]
            Self::LeakingBucket(a) => a.check_and_record(storage, key, quota, now_ms).await,
            #[cfg(feature = "fixed-window")]
            Self::FixedWindow(a) => a.check_and_record(storage, key, quota, now_ms).await,
            #[cfg(feature = "sliding-log")]
            Self::SlidingWindowLog(a) => a.check_and_record(storage, key, quota, now_ms).await,
            #[cfg(feature = "sliding-window-counter")]
            Self::SlidingWindowCounter(a) => a.check_and_record(storage, key, quota, now_ms).await,
        }
    }

    async fn check<S: Storage>(
        &self,
        storage: &S,
        key: &str,
        quota: &Quota,
        now_ms: u64,
    ) -> Result<Decision> {
        match self {
            #[cfg(feature = "token-bucket")]
            Self::TokenBucket(a) => a.check(storage, key, quota, now_ms).await,
            #[cfg(feature = "leaking-bucket")]
            Self::LeakingBucket(a) => a.check(storage, key, quota, now_ms).await,
            #[cfg(feature = "fixed-window")]
            Self::FixedWindow(a) => a.check(storage, key, quota, now_ms).await,
            #[cfg(feature = "sliding-log")]
            Self::SlidingWindowLog(a) => a.check(storage, key, quota, now_ms).await,
            #[cfg(feature = "sliding-window-counter")]
            Self::SlidingWindowCounter(a) => a.check(storage, key, quota, now_ms).await,
        }
    }
}
