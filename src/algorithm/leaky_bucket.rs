//! Leaking Bucket rate limiting algorithm.
//!
//! Requests queue up FIFO and drain at a constant `processing_rate`; a request
//! that arrives when the queue is already at `queue_size` is rejected outright.

use std::time::Duration;

use crate::algorithm::Algorithm;
use crate::decision::{Decision, DecisionMetadata, RateLimitInfo};
use crate::error::Result;
use crate::quota::Quota;
use crate::storage::{Storage, StorageEntry};

/// Leaking Bucket rate limiting algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeakingBucket;

impl LeakingBucket {
    /// Create a new Leaking Bucket algorithm instance.
    pub fn new() -> Self {
        Self
    }

    /// Drain entries that have leaked out of the queue by `now_ms`, given
    /// `processing_rate` requests leak per second.
    ///
    /// Returns the drained queue alongside the `last_update` that should be
    /// stored going forward: unchanged if nothing leaked this call, so the
    /// fractional time since the last actual leak is never discarded. Always
    /// advancing to `now_ms` here would let a steady stream of sub-leak-interval
    /// calls starve the queue forever, since each call would see only the
    /// short gap since the previous call rather than the true elapsed time.
    fn drain(&self, mut queue: Vec<u64>, last_update: u64, now_ms: u64, processing_rate: f64) -> (Vec<u64>, u64) {
        if now_ms <= last_update || queue.is_empty() {
            return (queue, last_update);
        }
        let elapsed_secs = (now_ms - last_update) as f64 / 1000.0;
        let leaked = (elapsed_secs * processing_rate).floor() as usize;
        if leaked > 0 {
            queue.drain(0..leaked.min(queue.len()));
            (queue, now_ms)
        } else {
            (queue, last_update)
        }
    }

    fn build_info(&self, queue_len: u64, quota: &Quota, now_ms: u64) -> RateLimitInfo {
        let queue_size = quota.effective_queue_size();
        let processing_rate = quota.effective_processing_rate().max(f64::MIN_POSITIVE);
        let remaining = queue_size.saturating_sub(queue_len);

        // Time for the whole queue ahead of a new arrival to drain.
        let drain_secs = queue_len as f64 / processing_rate;
        let reset_at = now_ms / 1000 + drain_secs.ceil() as u64;

        RateLimitInfo::new(queue_size, remaining, reset_at, queue_len)
            .with_algorithm("leaking_bucket")
            .with_metadata(DecisionMetadata::new().with_queue_length(queue_len))
    }
}

impl Algorithm for LeakingBucket {
    fn name(&self) -> &'static str {
        "leaking_bucket"
    }

    async fn check_and_record<S: Storage>(
        &self,
        storage: &S,
        key: &str,
        quota: &Quota,
        now_ms: u64,
    ) -> Result<Decision> {
        let queue_size = quota.effective_queue_size() as usize;
        let processing_rate = quota.effective_processing_rate().max(f64::MIN_POSITIVE);

        let ttl_ms = ((queue_size as f64 / processing_rate) * 1000.0 * 2.0) as u64;
        let ttl = Duration::from_millis(ttl_ms.max(1000));

        let decision = storage
            .execute_atomic(key, ttl, |entry| {
                let (queue, last_update) = match entry {
                    Some(e) => (e.queue.unwrap_or_default(), e.last_update),
                    None => (Vec::new(), now_ms),
                };
                let (mut queue, last_update) = self.drain(queue, last_update, now_ms, processing_rate);

                if queue.len() < queue_size {
                    queue.push(now_ms);
                    let len = queue.len() as u64;
                    let new_entry = StorageEntry::with_queue(queue, now_ms);
                    let info = self.build_info(len, quota, now_ms);
                    (new_entry, Decision::allowed(info))
                } else {
                    let len = queue.len() as u64;
                    let drain_secs = 1.0 / processing_rate;
                    let retry_after = Duration::from_millis((drain_secs * 1000.0).ceil() as u64);
                    let new_entry = StorageEntry::with_queue(queue, last_update);
                    let info = self
                        .build_info(len, quota, now_ms)
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
        let queue_size = quota.effective_queue_size() as usize;
        let processing_rate = quota.effective_processing_rate().max(f64::MIN_POSITIVE);

        let entry = storage.get(key).await?;
        let (queue, last_update) = match entry {
            Some(e) => (e.queue.unwrap_or_default(), e.last_update),
            None => (Vec::new(), now_ms),
        };
        let (queue, _) = self.drain(queue, last_update, now_ms, processing_rate);
        let len = queue.len() as u64;

        let info = self.build_info(len, quota, now_ms);

        Ok(if queue.len() < queue_size {
            Decision::allowed(info)
        } else {
            let retry_after = Duration::from_millis((1000.0 / processing_rate).ceil() as u64);
            Decision::denied(info.with_retry_after(retry_after))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn test_leaking_bucket_basic() {
        let algorithm = LeakingBucket::new();
        let storage = MemoryStorage::new();
        let quota = Quota::per_second(10).with_queue_size(5);

        for i in 1..=5 {
            let decision = algorithm.check_and_record(&storage, "user:1", &quota, 0).await.unwrap();
            assert!(decision.is_allowed(), "Request {} should be allowed", i);
        }

        let decision = algorithm.check_and_record(&storage, "user:1", &quota, 0).await.unwrap();
        assert!(decision.is_denied());
    }

    #[tokio::test]
    async fn test_leaking_bucket_drain() {
        let algorithm = LeakingBucket::new();
        let storage = MemoryStorage::new();
        let quota = Quota::per_second(10).with_queue_size(2);

        algorithm.check_and_record(&storage, "user:1", &quota, 0).await.unwrap();
        algorithm.check_and_record(&storage, "user:1", &quota, 0).await.unwrap();

        let decision = algorithm.check_and_record(&storage, "user:1", &quota, 0).await.unwrap();
        assert!(decision.is_denied());

        // At 10 req/s, 150ms should drain one slot.
        let decision = algorithm.check_and_record(&storage, "user:1", &quota, 150).await.unwrap();
        assert!(decision.is_allowed());
    }

    #[tokio::test]
    async fn test_leaking_bucket_queue_length_reported() {
        let algorithm = LeakingBucket::new();
        let storage = MemoryStorage::new();
        let quota = Quota::per_second(10).with_queue_size(3);

        let decision = algorithm.check_and_record(&storage, "user:1", &quota, 0).await.unwrap();
        let metadata = decision.info().metadata.as_ref().unwrap();
        assert_eq!(metadata.queue_length, Some(1));
    }
}
