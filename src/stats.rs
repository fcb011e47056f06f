//! Process-wide rate limiting statistics.
//!
//! `Stats` tracks how many requests were seen, allowed, and blocked, broken
//! down per algorithm, plus an approximate count of distinct keys observed.
//! Every counter is an atomic or a concurrent map so the write path never
//! blocks a request behind a global lock, matching the concurrency posture
//! the teacher crate's `MemoryStorage` uses for its own state.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};

/// Default cap on the unique-key sketch before it stops admitting new keys.
///
/// A plain unbounded set would grow with the number of distinct clients ever
/// seen; capping it trades exact cardinality for a bounded memory footprint,
/// as called out in the design notes this module implements.
const DEFAULT_UNIQUE_KEY_CAP: usize = 1_000_000;

/// Per-algorithm request counters.
#[derive(Debug, Default)]
struct AlgorithmCounters {
    total: AtomicU64,
    allowed: AtomicU64,
    blocked: AtomicU64,
}

impl AlgorithmCounters {
    fn record(&self, allowed: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.blocked.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> AlgorithmStats {
        AlgorithmStats {
            total: self.total.load(Ordering::Relaxed),
            allowed: self.allowed.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.allowed.store(0, Ordering::Relaxed);
        self.blocked.store(0, Ordering::Relaxed);
    }
}

/// Process-wide rate limiting counters, shared across every request path.
///
/// Every write is O(1): an atomic add for the totals, a `DashMap`/`DashSet`
/// entry touch for the per-algorithm breakdown and the unique-key sketch.
/// Failed (fail-open) checks never call into `Stats` at all — see the
/// middleware's operational sequence.
#[derive(Debug)]
pub struct Stats {
    total: AtomicU64,
    allowed: AtomicU64,
    blocked: AtomicU64,
    by_algorithm: DashMap<&'static str, AlgorithmCounters>,
    unique_keys: DashSet<u64>,
    unique_key_cap: usize,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    /// Create a new, zeroed stats aggregator with the default unique-key cap.
    pub fn new() -> Self {
        Self::with_unique_key_cap(DEFAULT_UNIQUE_KEY_CAP)
    }

    /// Create a stats aggregator with a custom unique-key cardinality cap.
    pub fn with_unique_key_cap(cap: usize) -> Self {
        Self {
            total: AtomicU64::new(0),
            allowed: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            by_algorithm: DashMap::new(),
            unique_keys: DashSet::new(),
            unique_key_cap: cap,
        }
    }

    /// Register a key as observed, for the unique-key cardinality estimate.
    ///
    /// Once the sketch reaches its cap, further distinct keys stop being
    /// recorded; `unique_keys()` then reports a floor rather than an exact
    /// count. Hashing the key keeps the sketch's footprint independent of
    /// key length.
    pub fn observe_key(&self, key: &str) {
        if self.unique_keys.len() >= self.unique_key_cap {
            return;
        }
        let hash = fxhash(key);
        self.unique_keys.insert(hash);
    }

    /// Record a decision for the named algorithm.
    pub fn record(&self, algorithm: &'static str, allowed: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.blocked.fetch_add(1, Ordering::Relaxed);
        }
        self.by_algorithm
            .entry(algorithm)
            .or_default()
            .record(allowed);
    }

    /// Approximate number of distinct keys observed since the last reset.
    pub fn unique_keys(&self) -> u64 {
        self.unique_keys.len() as u64
    }

    /// Take an owned, serializable snapshot of the current counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let requests_by_algorithm = self
            .by_algorithm
            .iter()
            .map(|entry| (entry.key().to_string(), entry.value().snapshot()))
            .collect();

        StatsSnapshot {
            total_requests: self.total.load(Ordering::Relaxed),
            allowed_requests: self.allowed.load(Ordering::Relaxed),
            blocked_requests: self.blocked.load(Ordering::Relaxed),
            unique_keys: self.unique_keys(),
            requests_by_algorithm,
        }
    }

    /// Zero every counter and clear the unique-key sketch.
    ///
    /// Does not touch the storage backend; callers that also want to clear
    /// storage state should call `Storage::reset_all` themselves (the
    /// middleware's `RateLimiter::reset` does both).
    pub fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.allowed.store(0, Ordering::Relaxed);
        self.blocked.store(0, Ordering::Relaxed);
        for entry in self.by_algorithm.iter() {
            entry.value().reset();
        }
        self.unique_keys.clear();
    }
}

/// An owned, JSON-serializable snapshot of `Stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// Total requests observed across all algorithms.
    pub total_requests: u64,
    /// Requests that were allowed.
    pub allowed_requests: u64,
    /// Requests that were blocked.
    pub blocked_requests: u64,
    /// Approximate number of distinct keys observed.
    pub unique_keys: u64,
    /// Per-algorithm breakdown, keyed by algorithm name.
    pub requests_by_algorithm: std::collections::HashMap<String, AlgorithmStats>,
}

/// Total/allowed/blocked counters for a single algorithm.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AlgorithmStats {
    /// Total requests seen by this algorithm.
    pub total: u64,
    /// Requests allowed by this algorithm.
    pub allowed: u64,
    /// Requests blocked by this algorithm.
    pub blocked: u64,
}

/// A small, fast, non-cryptographic string hash (FNV-1a) used only to bound
/// the unique-key sketch's memory, not for anything security-sensitive.
fn fxhash(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in s.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_record_totals() {
        let stats = Stats::new();
        stats.record("token_bucket", true);
        stats.record("token_bucket", false);
        stats.record("fixed_window", true);

        let snap = stats.snapshot();
        assert_eq!(snap.total_requests, 3);
        assert_eq!(snap.allowed_requests, 2);
        assert_eq!(snap.blocked_requests, 1);
    }

    #[test]
    fn test_stats_per_algorithm_breakdown() {
        let stats = Stats::new();
        stats.record("token_bucket", true);
        stats.record("token_bucket", true);
        stats.record("fixed_window", false);

        let snap = stats.snapshot();
        let tb = &snap.requests_by_algorithm["token_bucket"];
        assert_eq!(tb.total, 2);
        assert_eq!(tb.allowed, 2);
        assert_eq!(tb.blocked, 0);

        let fw = &snap.requests_by_algorithm["fixed_window"];
        assert_eq!(fw.total, 1);
        assert_eq!(fw.blocked, 1);
    }

    #[test]
    fn test_stats_unique_keys() {
        let stats = Stats::new();
        stats.observe_key("user:1");
        stats.observe_key("user:2");
        stats.observe_key("user:1");

        assert_eq!(stats.unique_keys(), 2);
    }

    #[test]
    fn test_stats_unique_key_cap() {
        let stats = Stats::with_unique_key_cap(2);
        stats.observe_key("a");
        stats.observe_key("b");
        stats.observe_key("c");

        assert_eq!(stats.unique_keys(), 2);
    }

    #[test]
    fn test_stats_reset() {
        let stats = Stats::new();
        stats.record("token_bucket", true);
        stats.observe_key("user:1");

        stats.reset();

        let snap = stats.snapshot();
        assert_eq!(snap.total_requests, 0);
        assert_eq!(snap.unique_keys, 0);
        assert!(snap.requests_by_algorithm["token_bucket"].total == 0);
    }

    #[test]
    fn test_stats_fail_open_not_recorded() {
        // Fail-open decisions never call `record`, so stats stay untouched;
        // this test documents the contract rather than exercising new code.
        let stats = Stats::new();
        assert_eq!(stats.snapshot().total_requests, 0);
    }
}
