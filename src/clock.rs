//! Time source abstraction.
//!
//! Every algorithm takes `now_ms` as an explicit parameter rather than reading
//! `SystemTime::now()` itself; `Clock` is the one seam that produces that value,
//! which keeps the algorithms deterministic under test.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of the current time, in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + 'static {
    /// Current time in milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;
}

/// The real wall clock, backed by `SystemTime::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A deterministic, manually-advanced clock for tests.
#[derive(Debug, Clone)]
pub struct TestClock {
    now: Arc<AtomicU64>,
}

impl TestClock {
    /// Create a test clock starting at the given time.
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, duration: Duration) {
        self.now.fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    /// Set the clock to an absolute time.
    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Clock for TestClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_plausible() {
        let clock = SystemClock::new();
        let now = clock.now_ms();
        assert!(now > 1_700_000_000_000);
    }

    #[test]
    fn test_test_clock_advance() {
        let clock = TestClock::new(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now_ms(), 6_000);
    }

    #[test]
    fn test_test_clock_set() {
        let clock = TestClock::new(0);
        clock.set(42_000);
        assert_eq!(clock.now_ms(), 42_000);
    }

    #[test]
    fn test_test_clock_clone_shares_state() {
        let clock = TestClock::new(0);
        let clone = clock.clone();
        clock.advance(Duration::from_secs(1));
        assert_eq!(clone.now_ms(), 1_000);
    }
}
