//! Rate limit manager for per-route configuration.
//!
//! The `RateLimitManager` allows you to configure different rate limits
//! for different routes or patterns, with optional default fallback.
//!
//! # Example
//!
//! ```ignore
//! use ratelimit_core::{RateLimitManager, Quota, TokenBucket, MemoryStorage, SystemClock};
//!
//! let storage = MemoryStorage::new();
//! let manager = RateLimitManager::builder()
//!     .default_quota(Quota::per_second(10))
//!     .route("/api/search", Quota::per_minute(30))
//!     .route("/api/auth/login", Quota::per_minute(5))
//!     .route_pattern("/api/users/*", Quota::per_second(20))
//!     .build(TokenBucket::new(), storage, SystemClock::new());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::algorithm::Algorithm;
use crate::clock::Clock;
use crate::decision::Decision;
use crate::error::Result;
use crate::key::Key;
use crate::quota::Quota;
use crate::storage::Storage;

/// A rate limit configuration for a specific route.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// The quota for this route.
    pub quota: Quota,
    /// Optional custom key suffix.
    pub key_suffix: Option<String>,
}

impl RouteConfig {
    /// Create a new route config with the given quota.
    pub fn new(quota: Quota) -> Self {
        Self {
            quota,
            key_suffix: None,
        }
    }

    /// Add a custom key suffix.
    pub fn with_key_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.key_suffix = Some(suffix.into());
        self
    }
}

impl From<Quota> for RouteConfig {
    fn from(quota: Quota) -> Self {
        Self::new(quota)
    }
}

/// Manager for per-route rate limiting.
///
/// This provides a centralized way to configure different rate limits
/// for different routes or patterns.
pub struct RateLimitManager<A, S, K, C> {
    algorithm: A,
    storage: Arc<S>,
    key_extractor: K,
    clock: C,
    default_quota: Option<Quota>,
    routes: HashMap<String, RouteConfig>,
    patterns: Vec<(String, RouteConfig)>,
}

impl<A, S, K, C> RateLimitManager<A, S, K, C>
where
    A: Algorithm,
    S: Storage,
    C: Clock,
{
    /// Create a new rate limit manager builder.
    pub fn builder() -> RateLimitManagerBuilder<K> {
        RateLimitManagerBuilder::new()
    }

    /// Check and record a request.
    pub async fn check_and_record<R>(&self, path: &str, request: &R) -> Result<Decision>
    where
        K: Key<R>,
    {
        let config = self.get_config(path);

        let now_ms = self.clock.now_ms();
        let Some(quota) = config.map(|c| &c.quota).or(self.default_quota.as_ref()) else {
            // No quota configured for this route, allow with an hour-wide
            // "unbounded" window so the response still carries sane headers.
            return Ok(Decision::allowed(crate::decision::RateLimitInfo::new(
                u64::MAX,
                u64::MAX,
                now_ms / 1000 + 3600,
                0,
            )));
        };

        // Build the key
        let base_key = self.key_extractor.extract(request).unwrap_or_else(|| "unknown".to_string());
        let key = if let Some(suffix) = config.and_then(|c| c.key_suffix.as_ref()) {
            format!("{}:{}", base_key, suffix)
        } else {
            format!("{}:{}", base_key, path)
        };

        self.algorithm
            .check_and_record(&*self.storage, &key, quota, now_ms)
            .await
    }

    /// Check without recording.
    pub async fn check<R>(&self, path: &str, request: &R) -> Result<Decision>
    where
        K: Key<R>,
    {
        let config = self.get_config(path);

        let now_ms = self.clock.now_ms();
        let Some(quota) = config.map(|c| &c.quota).or(self.default_quota.as_ref()) else {
            return Ok(Decision::allowed(crate::decision::RateLimitInfo::new(
                u64::MAX,
                u64::MAX,
                now_ms / 1000 + 3600,
                0,
            )));
        };

        let base_key = self.key_extractor.extract(request).unwrap_or_else(|| "unknown".to_string());
        let key = if let Some(suffix) = config.and_then(|c| c.key_suffix.as_ref()) {
            format!("{}:{}", base_key, suffix)
        } else {
            format!("{}:{}", base_key, path)
        };

        self.algorithm.check(&*self.storage, &key, quota, now_ms).await
    }

    /// Get the configuration for a path.
    fn get_config(&self, path: &str) -> Option<&RouteConfig> {
        // Exact match first
        if let Some(config) = self.routes.get(path) {
            return Some(config);
        }

        // Pattern matching
        for (pattern, config) in &self.patterns {
            if pattern_matches(pattern, path) {
                return Some(config);
            }
        }

        None
    }

    /// Reset rate limit for a specific key.
    pub async fn reset(&self, key: &str) -> Result<()> {
        self.algorithm.reset(&*self.storage, key).await
    }
}

/// Check if a pattern matches a path.
///
/// Simple glob-style matching:
/// - `*` matches any single path segment
/// - `**` matches any number of segments
fn pattern_matches(pattern: &str, path: &str) -> bool {
    let pattern_parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let mut pi = 0; // pattern index
    let mut pa = 0; // path index

    while pi < pattern_parts.len() && pa < path_parts.len() {
        let p = pattern_parts[pi];

        if p == "**" {
            // ** matches rest of path
            return true;
        } else if p == "*" {
            // * matches single segment
            pi += 1;
            pa += 1;
        } else if p == path_parts[pa] {
            // Exact match
            pi += 1;
            pa += 1;
        } else {
            return false;
        }
    }

    // Pattern exhausted - check if path is also exhausted
    pi == pattern_parts.len() && pa == path_parts.len()
}

/// Builder for RateLimitManager.
pub struct RateLimitManagerBuilder<K> {
    default_quota: Option<Quota>,
    routes: HashMap<String, RouteConfig>,
    patterns: Vec<(String, RouteConfig)>,
    key_extractor: Option<K>,
}

impl<K> Default for RateLimitManagerBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> RateLimitManagerBuilder<K> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            default_quota: None,
            routes: HashMap::new(),
            patterns: Vec::new(),
            key_extractor: None,
        }
    }

    /// Set the default quota for routes without specific configuration.
    pub fn default_quota(mut self, quota: Quota) -> Self {
        self.default_quota = Some(quota);
        self
    }

    /// Add a rate limit for a specific route.
    pub fn route(mut self, path: impl Into<String>, config: impl Into<RouteConfig>) -> Self {
        self.routes.insert(path.into(), config.into());
        self
    }

    /// Add a rate limit for a route pattern.
    ///
    /// Patterns support `*` for single segment and `**` for multiple segments.
    pub fn route_pattern(
        mut self,
        pattern: impl Into<String>,
        config: impl Into<RouteConfig>,
    ) -> Self {
        self.patterns.push((pattern.into(), config.into()));
        self
    }

    /// Set the key extractor.
    pub fn key_extractor(mut self, extractor: K) -> Self {
        self.key_extractor = Some(extractor);
        self
    }

    /// Build the manager with the given algorithm, storage, and clock.
    pub fn build<A, S, C>(self, algorithm: A, storage: S, clock: C) -> RateLimitManager<A, S, K, C>
    where
        K: Default,
    {
        RateLimitManager {
            algorithm,
            storage: Arc::new(storage),
            key_extractor: self.key_extractor.unwrap_or_default(),
            clock,
            default_quota: self.default_quota,
            routes: self.routes,
            patterns: self.patterns,
        }
    }

    /// Build the manager with a specific key extractor.
    pub fn build_with_key<A, S, C>(
        self,
        algorithm: A,
        storage: S,
        key_extractor: K,
        clock: C,
    ) -> RateLimitManager<A, S, K, C> {
        RateLimitManager {
            algorithm,
            storage: Arc::new(storage),
            key_extractor,
            clock,
            default_quota: self.default_quota,
            routes: self.routes,
            patterns: self.patterns,
        }
    }
}
