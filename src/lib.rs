//! Pluggable rate limiting core for Rust services.
//!
//! `ratelimit_core` provides a modular rate limiting solution with:
//!
//! - **Multiple algorithms**: Token Bucket, Leaking Bucket, Fixed Window,
//!   Sliding Window Log, and Sliding Window Counter.
//! - **Pluggable storage**: in-memory with background GC, Redis with
//!   connection pooling.
//! - **Per-route quotas**: different limits for different endpoints via
//!   [`RateLimitManager`].
//! - **Composite keys**: rate limit by IP + path, user + API key, etc.
//! - **Framework integration**: Axum (Tower layer) and Actix-web middleware,
//!   both built on the same framework-agnostic [`middleware::RateLimiter`]
//!   core.
//! - **Stats**: a process-wide [`stats::Stats`] aggregator tracking total,
//!   allowed, and blocked requests per algorithm, plus approximate unique-key
//!   cardinality.
//!
//! # Quick Start
//!
//! ```ignore
//! use ratelimit_core::{TokenBucket, Quota, MemoryStorage, Algorithm, SystemClock, Clock};
//!
//! #[tokio::main]
//! async fn main() {
//!     let storage = MemoryStorage::new();
//!     let algorithm = TokenBucket::new();
//!     let quota = Quota::per_second(10).with_bucket_size(15);
//!     let clock = SystemClock::new();
//!
//!     let decision = algorithm
//!         .check_and_record(&storage, "user:123", &quota, clock.now_ms())
//!         .await
//!         .unwrap();
//!
//!     if decision.is_allowed() {
//!         println!("Request allowed! {} remaining", decision.info().remaining);
//!     } else {
//!         println!("Rate limited! Retry after {:?}", decision.info().retry_after);
//!     }
//! }
//! ```
//!
//! # Algorithms
//!
//! | Algorithm | Best For | Memory | Feature Flag |
//! |-----------|----------|--------|--------------|
//! | Token Bucket | Bursty traffic | Low | `token-bucket` (default) |
//! | Leaking Bucket | Smooth output | Medium (queue) | `leaking-bucket` (default) |
//! | Fixed Window | Simple use cases | Low | `fixed-window` (default) |
//! | Sliding Window Log | Precision critical | High | `sliding-log` (default) |
//! | Sliding Window Counter | General purpose | Low | `sliding-window-counter` (default) |
//!
//! # Feature Flags
//!
//! - `memory` (default): in-memory storage with garbage collection.
//! - `redis`: Redis storage backend.
//! - `axum`: Axum/Tower middleware integration.
//! - `actix`: Actix-web middleware integration.
//! - `all-algorithms` (default): enables every algorithm above.
//! - `full`: everything.

pub mod algorithm;
pub mod clock;
pub mod decision;
pub mod error;
pub mod extensions;
pub mod headers;
pub mod key;
pub mod manager;
pub mod middleware;
pub mod quota;
pub mod stats;
pub mod storage;

// Re-export main types
pub use algorithm::Algorithm;
pub use clock::{Clock, SystemClock, TestClock};
pub use decision::{Decision, DecisionMetadata, RateLimitInfo};
pub use error::{ConfigError, ConnectionError, RateLimitError, Result, StorageError};
pub use key::{CompositeKey, FnKey, GlobalKey, Key, StaticKey};
pub use manager::{RateLimitManager, RateLimitManagerBuilder, RouteConfig};
pub use quota::{Quota, QuotaBuilder};
pub use stats::{AlgorithmStats, Stats, StatsSnapshot};
pub use storage::{Storage, StorageEntry};

// Re-export middleware core types
pub use middleware::{LimiterOptions, LimiterOutcome, RateLimiter, RejectionBody};

// Re-export extensions and headers
pub use extensions::{RateLimitExt, RateLimitResponse};
pub use headers::RateLimitHeaders;

// Re-export algorithms
pub use algorithm::AnyAlgorithm;

#[cfg(feature = "token-bucket")]
pub use algorithm::TokenBucket;

#[cfg(feature = "leaking-bucket")]
pub use algorithm::LeakingBucket;

#[cfg(feature = "fixed-window")]
pub use algorithm::FixedWindow;

#[cfg(feature = "sliding-log")]
pub use algorithm::SlidingWindowLog;

#[cfg(feature = "sliding-window-counter")]
pub use algorithm::SlidingWindowCounter;

// Re-export storage types
#[cfg(feature = "memory")]
pub use storage::{GcConfig, GcInterval, MemoryStorage};

#[cfg(feature = "redis")]
pub use storage::{RedisConfig, RedisStorage};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::algorithm::{Algorithm, AnyAlgorithm};
    pub use crate::clock::{Clock, SystemClock, TestClock};
    pub use crate::decision::{Decision, RateLimitInfo};
    pub use crate::error::{RateLimitError, Result};
    pub use crate::quota::Quota;
    pub use crate::storage::Storage;

    #[cfg(feature = "token-bucket")]
    pub use crate::algorithm::TokenBucket;

    #[cfg(feature = "leaking-bucket")]
    pub use crate::algorithm::LeakingBucket;

    #[cfg(feature = "fixed-window")]
    pub use crate::algorithm::FixedWindow;

    #[cfg(feature = "sliding-log")]
    pub use crate::algorithm::SlidingWindowLog;

    #[cfg(feature = "sliding-window-counter")]
    pub use crate::algorithm::SlidingWindowCounter;

    #[cfg(feature = "memory")]
    pub use crate::storage::{GcConfig, GcInterval, MemoryStorage};
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[cfg(all(feature = "memory", feature = "token-bucket"))]
    #[tokio::test]
    async fn test_integration_token_bucket_burst_then_throttle() {
        let storage = MemoryStorage::new();
        let algorithm = TokenBucket::new();
        let quota = Quota::per_minute(60).with_bucket_size(5);
        let clock = SystemClock::new();

        for i in 1..=5 {
            let decision = algorithm
                .check_and_record(&storage, "user:1", &quota, clock.now_ms())
                .await
                .unwrap();
            assert!(decision.is_allowed(), "request {} should be allowed", i);
        }

        let decision = algorithm
            .check_and_record(&storage, "user:1", &quota, clock.now_ms())
            .await
            .unwrap();
        assert!(decision.is_denied());
        assert!(decision.info().retry_after.is_some());
    }

    #[cfg(all(feature = "memory", feature = "fixed-window"))]
    #[tokio::test]
    async fn test_integration_headers() {
        let storage = MemoryStorage::new();
        let algorithm = FixedWindow::new();
        let quota = Quota::per_minute(100);
        let clock = SystemClock::new();

        let decision = algorithm
            .check_and_record(&storage, "user:1", &quota, clock.now_ms())
            .await
            .unwrap();

        let headers = decision.info().to_headers();
        assert!(headers.iter().any(|(k, _)| *k == "X-RateLimit-Limit"));
        assert!(headers.iter().any(|(k, _)| *k == "X-RateLimit-Remaining"));
        assert!(headers.iter().any(|(k, _)| *k == "X-RateLimit-Reset"));
    }
}
