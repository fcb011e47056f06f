//! Quota configuration for rate limiting.
//!
//! A `Quota` defines the rate limiting parameters shared by every algorithm: how
//! many requests are allowed over what time window, plus a handful of
//! algorithm-specific knobs that default sensibly off of `max_requests`/`window`
//! so a bare `Quota::new` works with any algorithm.
//!
//! # Examples
//!
//! ```ignore
//! use ratelimit_core::Quota;
//! use std::time::Duration;
//!
//! // 100 requests per minute
//! let quota = Quota::per_minute(100);
//!
//! // Token bucket with a larger burst capacity than the steady-state rate
//! let quota = Quota::per_minute(100).with_bucket_size(150);
//!
//! // Leaking bucket that drains faster than the window average
//! let quota = Quota::per_minute(100).with_processing_rate(5.0);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Rate limiting quota configuration.
///
/// A quota defines the maximum number of requests allowed within a time window,
/// along with optional algorithm-specific parameters. Every optional field has a
/// default derived from `max_requests`/`window` so the same `Quota` value can be
/// handed to whichever algorithm a limiter was built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quota {
    /// Maximum number of requests in the window.
    max_requests: u64,

    /// Time window duration.
    window: Duration,

    /// Token bucket capacity (defaults to `max_requests`).
    bucket_size: Option<u64>,

    /// Token bucket refill rate, in tokens per `refill_interval` (defaults to 1).
    refill_rate: Option<f64>,

    /// Token bucket refill interval (defaults to `window / max_requests`).
    refill_interval: Option<Duration>,

    /// Leaking bucket queue capacity (defaults to `max_requests`).
    queue_size: Option<u64>,

    /// Leaking bucket processing rate, in requests per second
    /// (defaults to `max_requests / window_seconds`).
    processing_rate: Option<f64>,
}

impl Quota {
    /// Create a new quota with the given maximum requests and window.
    ///
    /// # Panics
    ///
    /// Panics if `max_requests` is 0 or `window` is zero duration.
    pub fn new(max_requests: u64, window: Duration) -> Self {
        assert!(max_requests > 0, "max_requests must be greater than 0");
        assert!(!window.is_zero(), "window must be non-zero");

        Self {
            max_requests,
            window,
            bucket_size: None,
            refill_rate: None,
            refill_interval: None,
            queue_size: None,
            processing_rate: None,
        }
    }

    /// Create a quota allowing `n` requests per second.
    pub fn per_second(n: u64) -> Self {
        Self::new(n, Duration::from_secs(1))
    }

    /// Create a quota allowing `n` requests per minute.
    pub fn per_minute(n: u64) -> Self {
        Self::new(n, Duration::from_secs(60))
    }

    /// Create a quota allowing `n` requests per hour.
    pub fn per_hour(n: u64) -> Self {
        Self::new(n, Duration::from_secs(3600))
    }

    /// Create a quota allowing `n` requests per day.
    pub fn per_day(n: u64) -> Self {
        Self::new(n, Duration::from_secs(86400))
    }

    /// Try to create a new quota, returning an error if invalid.
    pub fn try_new(max_requests: u64, window: Duration) -> Result<Self> {
        if max_requests == 0 {
            return Err(ConfigError::InvalidQuota("max_requests must be greater than 0".into()).into());
        }
        if window.is_zero() {
            return Err(ConfigError::InvalidQuota("window must be non-zero".into()).into());
        }
        Ok(Self {
            max_requests,
            window,
            bucket_size: None,
            refill_rate: None,
            refill_interval: None,
            queue_size: None,
            processing_rate: None,
        })
    }

    /// Set the token bucket capacity (must be >= 1; clamped up to `max_requests`
    /// if smaller).
    pub fn with_bucket_size(mut self, size: u64) -> Self {
        self.bucket_size = Some(size.max(1));
        self
    }

    /// Set the token bucket refill rate (tokens per `refill_interval`).
    pub fn with_refill_rate(mut self, rate: f64) -> Self {
        self.refill_rate = Some(rate);
        self
    }

    /// Set the token bucket refill interval.
    pub fn with_refill_interval(mut self, interval: Duration) -> Self {
        self.refill_interval = Some(interval);
        self
    }

    /// Set the leaking bucket queue capacity.
    pub fn with_queue_size(mut self, size: u64) -> Self {
        self.queue_size = Some(size.max(1));
        self
    }

    /// Set the leaking bucket processing rate (requests per second).
    pub fn with_processing_rate(mut self, rate: f64) -> Self {
        self.processing_rate = Some(rate);
        self
    }

    /// Get the maximum requests allowed per window.
    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    /// Get the window duration.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Get the effective token bucket capacity.
    pub fn effective_bucket_size(&self) -> u64 {
        self.bucket_size.unwrap_or(self.max_requests).max(1)
    }

    /// Get the effective token bucket refill rate, in tokens per refill interval.
    pub fn effective_refill_rate(&self) -> f64 {
        self.refill_rate.unwrap_or(1.0)
    }

    /// Get the effective token bucket refill interval.
    ///
    /// Defaults to `window / max_requests`, floored to at least 1ms so a refill
    /// step is always representable.
    pub fn effective_refill_interval(&self) -> Duration {
        self.refill_interval.unwrap_or_else(|| {
            let millis = self.window.as_millis() as u64 / self.max_requests.max(1);
            Duration::from_millis(millis.max(1))
        })
    }

    /// Get the effective leaking bucket queue capacity.
    pub fn effective_queue_size(&self) -> u64 {
        self.queue_size.unwrap_or(self.max_requests).max(1)
    }

    /// Get the effective leaking bucket processing rate, in requests per second.
    pub fn effective_processing_rate(&self) -> f64 {
        self.processing_rate.unwrap_or_else(|| {
            self.max_requests as f64 / self.window.as_secs_f64()
        })
    }

    /// Calculate how long until a quota would be fully replenished.
    pub fn full_replenish_time(&self) -> Duration {
        self.window
    }
}

impl Default for Quota {
    fn default() -> Self {
        Self::per_minute(60)
    }
}

/// Builder for creating quotas with validation.
#[derive(Debug, Default)]
pub struct QuotaBuilder {
    max_requests: Option<u64>,
    window: Option<Duration>,
    bucket_size: Option<u64>,
    refill_rate: Option<f64>,
    refill_interval: Option<Duration>,
    queue_size: Option<u64>,
    processing_rate: Option<f64>,
}

impl QuotaBuilder {
    /// Create a new quota builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum requests per window.
    pub fn max_requests(mut self, n: u64) -> Self {
        self.max_requests = Some(n);
        self
    }

    /// Set the window duration.
    pub fn window(mut self, duration: Duration) -> Self {
        self.window = Some(duration);
        self
    }

    /// Set the token bucket capacity.
    pub fn bucket_size(mut self, n: u64) -> Self {
        self.bucket_size = Some(n);
        self
    }

    /// Set the token bucket refill rate.
    pub fn refill_rate(mut self, rate: f64) -> Self {
        self.refill_rate = Some(rate);
        self
    }

    /// Set the token bucket refill interval.
    pub fn refill_interval(mut self, interval: Duration) -> Self {
        self.refill_interval = Some(interval);
        self
    }

    /// Set the leaking bucket queue capacity.
    pub fn queue_size(mut self, n: u64) -> Self {
        self.queue_size = Some(n);
        self
    }

    /// Set the leaking bucket processing rate.
    pub fn processing_rate(mut self, rate: f64) -> Self {
        self.processing_rate = Some(rate);
        self
    }

    /// Build the quota, returning an error if invalid.
    pub fn build(self) -> Result<Quota> {
        let max_requests = self.max_requests
            .ok_or_else(|| ConfigError::MissingRequired("max_requests".into()))?;
        let window = self.window
            .ok_or_else(|| ConfigError::MissingRequired("window".into()))?;

        let mut quota = Quota::try_new(max_requests, window)?;

        if let Some(v) = self.bucket_size {
            quota = quota.with_bucket_size(v);
        }
        if let Some(v) = self.refill_rate {
            quota = quota.with_refill_rate(v);
        }
        if let Some(v) = self.refill_interval {
            quota = quota.with_refill_interval(v);
        }
        if let Some(v) = self.queue_size {
            quota = quota.with_queue_size(v);
        }
        if let Some(v) = self.processing_rate {
            quota = quota.with_processing_rate(v);
        }

        Ok(quota)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_per_second() {
        let quota = Quota::per_second(10);
        assert_eq!(quota.max_requests(), 10);
        assert_eq!(quota.window(), Duration::from_secs(1));
        assert_eq!(quota.effective_bucket_size(), 10);
        assert!((quota.effective_processing_rate() - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_quota_per_minute() {
        let quota = Quota::per_minute(60);
        assert_eq!(quota.max_requests(), 60);
        assert_eq!(quota.window(), Duration::from_secs(60));
        assert!((quota.effective_processing_rate() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_quota_with_bucket_size() {
        let quota = Quota::per_minute(60).with_bucket_size(100);
        assert_eq!(quota.max_requests(), 60);
        assert_eq!(quota.effective_bucket_size(), 100);
    }

    #[test]
    fn test_quota_bucket_size_defaults_to_max_requests() {
        let quota = Quota::per_minute(60);
        assert_eq!(quota.effective_bucket_size(), 60);
    }

    #[test]
    fn test_quota_refill_interval_default() {
        let quota = Quota::new(10, Duration::from_secs(10));
        assert_eq!(quota.effective_refill_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_quota_queue_size_defaults_to_max_requests() {
        let quota = Quota::per_second(5);
        assert_eq!(quota.effective_queue_size(), 5);
    }

    #[test]
    fn test_quota_builder() {
        let quota = QuotaBuilder::new()
            .max_requests(100)
            .window(Duration::from_secs(60))
            .bucket_size(150)
            .build()
            .unwrap();

        assert_eq!(quota.max_requests(), 100);
        assert_eq!(quota.window(), Duration::from_secs(60));
        assert_eq!(quota.effective_bucket_size(), 150);
    }

    #[test]
    fn test_quota_builder_missing_fields() {
        let result = QuotaBuilder::new()
            .max_requests(100)
            .build();
        assert!(result.is_err());

        let result = QuotaBuilder::new()
            .window(Duration::from_secs(60))
            .build();
        assert!(result.is_err());
    }

    #[test]
    #[should_panic]
    fn test_quota_zero_requests_panics() {
        Quota::new(0, Duration::from_secs(60));
    }

    #[test]
    #[should_panic]
    fn test_quota_zero_window_panics() {
        Quota::new(100, Duration::ZERO);
    }
}
