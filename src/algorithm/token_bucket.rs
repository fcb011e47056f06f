//! Token Bucket rate limiting algorithm.

use std::time::Duration;

use crate::algorithm::Algorithm;
use crate::decision::{Decision, DecisionMetadata, RateLimitInfo};
use crate::error::Result;
use crate::quota::Quota;
use crate::storage::{Storage, StorageEntry};

/// Token Bucket rate limiting algorithm.
///
/// Allows controlled bursts while enforcing an average rate limit. Tokens are
/// refilled in discrete steps of `refill_interval`: a step only lands once a
/// full interval has elapsed, so a caller accumulating sub-interval time keeps
/// it toward the next step rather than losing it to rounding.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenBucket;

impl TokenBucket {
    /// Create a new Token Bucket algorithm instance.
    pub fn new() -> Self {
        Self
    }

    /// Build rate limit info from current state.
    fn build_info(&self, tokens: f64, quota: &Quota, now_ms: u64) -> RateLimitInfo {
        let bucket_size = quota.effective_bucket_size();
        let refill_rate = quota.effective_refill_rate();
        let refill_interval_ms = quota.effective_refill_interval().as_millis() as u64;
        let remaining = tokens.floor() as u64;

        let steps_to_next_token = if tokens < 1.0 {
            ((1.0 - tokens) / refill_rate).ceil().max(1.0) as u64
        } else {
            0
        };

        let steps_to_full = {
            let missing = bucket_size as f64 - tokens;
            if missing > 0.0 {
                (missing / refill_rate).ceil().max(1.0) as u64
            } else {
                0
            }
        };

        let reset_at_ms = now_ms + steps_to_full * refill_interval_ms;
        let reset_at = reset_at_ms / 1000;

        let mut info = RateLimitInfo::new(bucket_size, remaining, reset_at, bucket_size - remaining)
            .with_algorithm("token_bucket")
            .with_metadata(DecisionMetadata::new().with_tokens_available(tokens));

        if remaining == 0 {
            info = info.with_retry_after(Duration::from_millis(
                steps_to_next_token * refill_interval_ms,
            ));
        }

        info
    }

    /// Refill tokens in discrete `refill_interval` steps, returning the new
    /// token count and the timestamp refill accounting last advanced to.
    fn refill(&self, tokens: f64, last_refill: u64, now_ms: u64, quota: &Quota) -> (f64, u64) {
        let bucket_size = quota.effective_bucket_size() as f64;
        let refill_rate = quota.effective_refill_rate();
        let interval_ms = quota.effective_refill_interval().as_millis().max(1) as u64;

        if now_ms <= last_refill {
            return (tokens, last_refill);
        }

        let steps = (now_ms - last_refill) / interval_ms;
        if steps == 0 {
            return (tokens, last_refill);
        }

        let new_tokens = (tokens + steps as f64 * refill_rate).min(bucket_size);
        (new_tokens, last_refill + steps * interval_ms)
    }
}

impl Algorithm for TokenBucket {
    fn name(&self) -> &'static str {
        "token_bucket"
    }

    async fn check_and_record<S: Storage>(
        &self,
        storage: &S,
        key: &str,
        quota: &Quota,
        now_ms: u64,
    ) -> Result<Decision> {
        let bucket_size = quota.effective_bucket_size() as f64;
        let refill_rate = quota.effective_refill_rate().max(f64::MIN_POSITIVE);
        let interval_ms = quota.effective_refill_interval().as_millis().max(1) as u64;

        let ttl_ms = ((bucket_size / refill_rate) * interval_ms as f64 * 2.0) as u64;
        let ttl = Duration::from_millis(ttl_ms.max(1000));

        let decision = storage
            .execute_atomic(key, ttl, |entry| {
                let (tokens, last_refill) = match entry {
                    Some(e) => (e.tokens.unwrap_or(bucket_size), e.last_update),
                    None => (bucket_size, now_ms),
                };

                let (mut tokens, last_refill) = self.refill(tokens, last_refill, now_ms, quota);

                if tokens >= 1.0 {
                    tokens -= 1.0;
                    let new_entry = StorageEntry::with_tokens(tokens, last_refill);
                    let info = self.build_info(tokens, quota, now_ms);
                    (new_entry, Decision::allowed(info))
                } else {
                    let new_entry = StorageEntry::with_tokens(tokens, last_refill);
                    let info = self.build_info(tokens, quota, now_ms);
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
        let bucket_size = quota.effective_bucket_size() as f64;

        let entry = storage.get(key).await?;

        let (tokens, last_refill) = match entry {
            Some(e) => (e.tokens.unwrap_or(bucket_size), e.last_update),
            None => (bucket_size, now_ms),
        };

        let (tokens, _) = self.refill(tokens, last_refill, now_ms, quota);
        let info = self.build_info(tokens, quota, now_ms);

        Ok(if tokens >= 1.0 {
            Decision::allowed(info)
        } else {
            Decision::denied(info)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn test_token_bucket_basic() {
        let algorithm = TokenBucket::new();
        let storage = MemoryStorage::new();
        let quota = Quota::per_minute(5).with_bucket_size(5);

        for i in 1..=5 {
            let decision = algorithm.check_and_record(&storage, "user:1", &quota, 0).await.unwrap();
            assert!(decision.is_allowed(), "Request {} should be allowed", i);
        }

        let decision = algorithm.check_and_record(&storage, "user:1", &quota, 0).await.unwrap();
        assert!(decision.is_denied());
    }

    #[tokio::test]
    async fn test_token_bucket_burst() {
        let algorithm = TokenBucket::new();
        let storage = MemoryStorage::new();
        let quota = Quota::per_second(1).with_bucket_size(10);

        for i in 1..=10 {
            let decision = algorithm.check_and_record(&storage, "user:1", &quota, 0).await.unwrap();
            assert!(decision.is_allowed(), "Burst request {} should be allowed", i);
        }

        let decision = algorithm.check_and_record(&storage, "user:1", &quota, 0).await.unwrap();
        assert!(decision.is_denied());
    }

    #[tokio::test]
    async fn test_token_bucket_refill() {
        let algorithm = TokenBucket::new();
        let storage = MemoryStorage::new();
        let quota = Quota::per_second(10).with_bucket_size(1);

        algorithm.check_and_record(&storage, "user:1", &quota, 0).await.unwrap();

        let decision = algorithm.check_and_record(&storage, "user:1", &quota, 0).await.unwrap();
        assert!(decision.is_denied());

        // Refill interval defaults to window/max_requests = 100ms.
        let decision = algorithm.check_and_record(&storage, "user:1", &quota, 150).await.unwrap();
        assert!(decision.is_allowed());
    }

    #[tokio::test]
    async fn test_token_bucket_discrete_refill_does_not_lose_subinterval_progress() {
        let algorithm = TokenBucket::new();
        let storage = MemoryStorage::new();
        // refill_interval defaults to 1000ms / 1 = 1000ms, one token per step.
        let quota = Quota::new(1, Duration::from_secs(1)).with_bucket_size(2);

        algorithm.check_and_record(&storage, "user:1", &quota, 0).await.unwrap();
        algorithm.check_and_record(&storage, "user:1", &quota, 0).await.unwrap();

        // Half an interval elapsed: no full step yet, still denied.
        let decision = algorithm.check_and_record(&storage, "user:1", &quota, 500).await.unwrap();
        assert!(decision.is_denied());

        // A full interval has now elapsed from the original last_refill.
        let decision = algorithm.check_and_record(&storage, "user:1", &quota, 1000).await.unwrap();
        assert!(decision.is_allowed());
    }
}
