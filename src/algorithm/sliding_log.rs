//! Sliding Window Log rate limiting algorithm.
//!
//! Stores the timestamp of every request within the trailing window, giving
//! an exact count at the cost of memory proportional to the limit.

use std::time::Duration;

use crate::algorithm::Algorithm;
use crate::decision::{Decision, RateLimitInfo};
use crate::error::Result;
use crate::quota::Quota;
use crate::storage::{Storage, StorageEntry};

/// Sliding Window Log rate limiting algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlidingWindowLog;

impl SlidingWindowLog {
    /// Create a new Sliding Window Log algorithm instance.
    pub fn new() -> Self {
        Self
    }

    /// Filter timestamps to only include those within the window.
    fn filter_window(&self, timestamps: &[u64], window_start: u64) -> Vec<u64> {
        timestamps
            .iter()
            .filter(|&&ts| ts >= window_start)
            .copied()
            .collect()
    }
}

impl Algorithm for SlidingWindowLog {
    fn name(&self) -> &'static str {
        "sliding_window_log"
    }

    async fn check_and_record<S: Storage>(
        &self,
        storage: &S,
        key: &str,
        quota: &Quota,
        now_ms: u64,
    ) -> Result<Decision> {
        let window_ms = quota.window().as_millis() as u64;
        let window_start = now_ms.saturating_sub(window_ms);
        let ttl = Duration::from_millis(window_ms * 2);
        let limit = quota.max_requests();

        let decision = storage
            .execute_atomic(key, ttl, |entry| {
                let mut timestamps = entry.and_then(|e| e.timestamps).unwrap_or_default();
                timestamps = self.filter_window(&timestamps, window_start);
                let current_count = timestamps.len() as u64;

                if current_count < limit {
                    timestamps.push(now_ms);
                    let new_entry = StorageEntry::with_timestamps(timestamps);

                    let remaining = limit - current_count - 1;
                    let reset_at = (now_ms + window_ms).div_ceil(1000);
                    let info = RateLimitInfo::new(limit, remaining, reset_at, current_count + 1)
                        .with_algorithm("sliding_window_log");

                    (new_entry, Decision::allowed(info))
                } else {
                    let new_entry = StorageEntry::with_timestamps(timestamps.clone());

                    let oldest = timestamps.first().copied().unwrap_or(now_ms);
                    let retry_ms = oldest + window_ms - now_ms;
                    let reset_at = (oldest + window_ms).div_ceil(1000);

                    let info = RateLimitInfo::new(limit, 0, reset_at, current_count)
                        .with_algorithm("sliding_window_log")
                        .with_retry_after(Duration::from_millis(retry_ms));

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
        let window_ms = quota.window().as_millis() as u64;
        let window_start = now_ms.saturating_sub(window_ms);
        let limit = quota.max_requests();

        let entry = storage.get(key).await?;
        let timestamps = entry.and_then(|e| e.timestamps).unwrap_or_default();

        let filtered = self.filter_window(&timestamps, window_start);
        let current_count = filtered.len() as u64;

        let remaining = limit.saturating_sub(current_count);
        let reset_at = if let Some(&oldest) = filtered.first() {
            (oldest + window_ms).div_ceil(1000)
        } else {
            (now_ms + window_ms).div_ceil(1000)
        };

        let info = RateLimitInfo::new(limit, remaining, reset_at, current_count)
            .with_algorithm("sliding_window_log");

        Ok(if current_count < limit {
            Decision::allowed(info)
        } else {
            let oldest = filtered.first().copied().unwrap_or(now_ms);
            let retry_ms = oldest + window_ms - now_ms;
            Decision::denied(info.with_retry_after(Duration::from_millis(retry_ms)))
        })
    }
}
