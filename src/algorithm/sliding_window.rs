//! Sliding Window Counter rate limiting algorithm.
//!
//! Approximates a sliding window by blending the current window's exact count
//! with a weighted share of the previous window's count, using two
//! independently-keyed counters rather than one entry carrying both — so each
//! window's count lives and expires under its own key.

use std::time::Duration;

use crate::algorithm::Algorithm;
use crate::decision::{Decision, RateLimitInfo};
use crate::error::Result;
use crate::quota::Quota;
use crate::storage::Storage;

/// Sliding Window Counter rate limiting algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlidingWindowCounter;

impl SlidingWindowCounter {
    /// Create a new Sliding Window Counter algorithm instance.
    pub fn new() -> Self {
        Self
    }

    fn window_start(&self, now_ms: u64, window_ms: u64) -> u64 {
        now_ms - (now_ms % window_ms)
    }

    fn windowed_key(&self, key: &str, window_start: u64) -> String {
        format!("{}:{}", key, window_start)
    }

    fn weighted_count(&self, current: u64, previous: u64, window_progress: f64) -> f64 {
        current as f64 + (previous as f64 * (1.0 - window_progress))
    }
}

impl Algorithm for SlidingWindowCounter {
    fn name(&self) -> &'static str {
        "sliding_window_counter"
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
        let previous_start = window_start.saturating_sub(window_ms);

        let curr_key = self.windowed_key(key, window_start);
        let prev_key = self.windowed_key(key, previous_start);
        let ttl = Duration::from_millis(window_ms * 2);

        let prev_count = storage.get(&prev_key).await?.map(|e| e.count).unwrap_or(0);
        let window_progress = (now_ms - window_start) as f64 / window_ms as f64;

        let decision = storage
            .execute_atomic(&curr_key, ttl, |entry| {
                let current_count = entry.map(|e| e.count).unwrap_or(0);
                let weighted = self.weighted_count(current_count, prev_count, window_progress);

                if weighted < limit as f64 {
                    let new_count = current_count + 1;
                    let new_entry = crate::storage::StorageEntry::new(new_count, window_start);
                    let remaining = (limit as f64 - weighted - 1.0).max(0.0) as u64;
                    let reset_at = (window_start + window_ms).div_ceil(1000);
                    let info =
                        RateLimitInfo::new(limit, remaining, reset_at, weighted as u64 + 1)
                            .with_algorithm("sliding_window_counter");
                    (new_entry, Decision::allowed(info))
                } else {
                    let new_entry = crate::storage::StorageEntry::new(current_count, window_start);
                    let reset_at = (window_start + window_ms).div_ceil(1000);
                    let retry_after = Duration::from_millis(window_start + window_ms - now_ms);
                    let info = RateLimitInfo::new(limit, 0, reset_at, weighted as u64)
                        .with_algorithm("sliding_window_counter")
                        .with_retry_after(retry_after);
                    (new_entry, Decision::denied(info))
                }
            })
            .await?;

        Ok(decision)
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
        let previous_start = window_start.saturating_sub(window_ms);

        let curr_key = self.windowed_key(key, window_start);
        let prev_key = self.windowed_key(key, previous_start);

        let current_count = storage.get(&curr_key).await?.map(|e| e.count).unwrap_or(0);
        let prev_count = storage.get(&prev_key).await?.map(|e| e.count).unwrap_or(0);

        let window_progress = (now_ms - window_start) as f64 / window_ms as f64;
        let weighted = self.weighted_count(current_count, prev_count, window_progress);

        let remaining = (limit as f64 - weighted).max(0.0) as u64;
        let reset_at = (window_start + window_ms).div_ceil(1000);
        let info = RateLimitInfo::new(limit, remaining, reset_at, weighted as u64)
            .with_algorithm("sliding_window_counter");

        Ok(if weighted < limit as f64 {
            Decision::allowed(info)
        } else {
            let retry_after = Duration::from_millis(window_start + window_ms - now_ms);
            Decision::denied(info.with_retry_after(retry_after))
        })
    }

    async fn reset<S: Storage>(&self, storage: &S, key: &str) -> Result<()> {
        storage.delete(key).await
    }
}
