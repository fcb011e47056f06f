//! Fixed Window rate limiting algorithm.
//!
//! The simplest counter-based algorithm: divide time into windows of fixed
//! length aligned to the epoch, and count requests within the current window.
//! Cheap, but allows up to `2x max_requests` across a window boundary.

use std::time::Duration;

use crate::algorithm::Algorithm;
use crate::decision::{Decision, DecisionMetadata, RateLimitInfo};
use crate::error::Result;
use crate::quota::Quota;
use crate::storage::Storage;

/// Fixed Window rate limiting algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedWindow;

impl FixedWindow {
    /// Create a new Fixed Window algorithm instance.
    pub fn new() -> Self {
        Self
    }

    fn window_start(&self, now_ms: u64, window_ms: u64) -> u64 {
        now_ms - (now_ms % window_ms)
    }

    fn windowed_key(&self, key: &str, window_start: u64) -> String {
        format!("{}:{}", key, window_start)
    }

    fn build_info(&self, count: u64, quota: &Quota, window_start: u64, window_ms: u64) -> RateLimitInfo {
        let limit = quota.max_requests();
        let remaining = limit.saturating_sub(count);
        let reset_at = (window_start + window_ms).div_ceil(1000);

        RateLimitInfo::new(limit, remaining, reset_at, count)
            .with_algorithm("fixed_window")
            .with_metadata(DecisionMetadata::new())
    }
}

impl Algorithm for FixedWindow {
    fn name(&self) -> &'static str {
        "fixed_window"
    }

    async fn check_and_record<S: Storage>(
        &self,
        storage: &S,
        key: &str,
        quota: &Quota,
        now_ms: u64,
    ) -> Result<Decision> {
        let window_ms = quota.window().as_millis().max(1) as u64;
        let limit = quota.max_requests();
        let window_start = self.window_start(now_ms, window_ms);
        let windowed_key = self.windowed_key(key, window_start);

        // Window keys naturally age out: TTL just needs to outlive one window.
        let ttl = Duration::from_millis(window_ms * 2);
        let count = storage.increment(&windowed_key, 1, window_start, ttl).await?;

        let info = self.build_info(count, quota, window_start, window_ms);

        if count <= limit {
            Ok(Decision::allowed(info))
        } else {
            let retry_after = Duration::from_millis(window_start + window_ms - now_ms);
            Ok(Decision::denied(info.with_retry_after(retry_after)))
        }
    }

    async fn check<S: Storage>(
        &self,
        storage: &S,
        key: &str,
        quota: &Quota,
        now_ms: u64,
    ) -> Result<Decision> {
        let window_ms = quota.window().as_millis().max(1) as u64;
        let limit = quota.max_requests();
        let window_start = self.window_start(now_ms, window_ms);
        let windowed_key = self.windowed_key(key, window_start);

        let entry = storage.get(&windowed_key).await?;
        let count = entry.map(|e| e.count).unwrap_or(0);

        let info = self.build_info(count, quota, window_start, window_ms);

        if count < limit {
            Ok(Decision::allowed(info))
        } else {
            let retry_after = Duration::from_millis(window_start + window_ms - now_ms);
            Ok(Decision::denied(info.with_retry_after(retry_after)))
        }
    }

    async fn reset<S: Storage>(&self, storage: &S, key: &str) -> Result<()> {
        // The exact windowed key is unknown without `now`, so only the
        // unscoped form is removed; windowed keys expire on their own TTL.
        storage.delete(key).await
    }
}
