//! Storage entry type for rate limiting state.

use serde::{Deserialize, Serialize};

/// Entry stored in the storage backend.
///
/// This struct contains all state needed by rate limiting algorithms,
/// designed to be flexible enough for any algorithm type. A given key is only
/// ever read by the one algorithm that wrote it, so each algorithm reads only
/// the fields it needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageEntry {
    /// Request count (for window-based algorithms).
    pub count: u64,

    /// Window start timestamp (Unix milliseconds).
    pub window_start: u64,

    /// Available tokens (for token bucket algorithm).
    pub tokens: Option<f64>,

    /// Last update timestamp (Unix milliseconds).
    pub last_update: u64,

    /// Request timestamps (for sliding window log algorithm).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Vec<u64>>,

    /// Arrival-time queue (for leaking bucket algorithm).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<Vec<u64>>,

    /// Optional metadata (algorithm-specific).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Vec<u8>>,
}

impl StorageEntry {
    /// Create a new storage entry for window-based algorithms.
    pub fn new(count: u64, window_start: u64) -> Self {
        Self {
            count,
            window_start,
            tokens: None,
            last_update: window_start,
            timestamps: None,
            queue: None,
            metadata: None,
        }
    }

    /// Create a storage entry for token bucket.
    pub fn with_tokens(tokens: f64, last_update: u64) -> Self {
        Self {
            count: 0,
            window_start: last_update,
            tokens: Some(tokens),
            last_update,
            timestamps: None,
            queue: None,
            metadata: None,
        }
    }

    /// Create a storage entry for sliding window log.
    pub fn with_timestamps(timestamps: Vec<u64>) -> Self {
        let now = timestamps.last().copied().unwrap_or(0);
        Self {
            count: timestamps.len() as u64,
            window_start: now,
            tokens: None,
            last_update: now,
            timestamps: Some(timestamps),
            queue: None,
            metadata: None,
        }
    }

    /// Create a storage entry for leaking bucket.
    pub fn with_queue(queue: Vec<u64>, last_update: u64) -> Self {
        Self {
            count: queue.len() as u64,
            window_start: last_update,
            tokens: None,
            last_update,
            timestamps: None,
            queue: Some(queue),
            metadata: None,
        }
    }

    /// Set the token count.
    pub fn set_tokens(mut self, tokens: f64) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Set the last update timestamp.
    pub fn set_last_update(mut self, last_update: u64) -> Self {
        self.last_update = last_update;
        self
    }

    /// Set metadata.
    pub fn set_metadata(mut self, metadata: Vec<u8>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Get tokens, defaulting to 0.0 if not set.
    pub fn tokens_or_default(&self) -> f64 {
        self.tokens.unwrap_or(0.0)
    }

    /// Get the queue, defaulting to empty if not set.
    pub fn queue_or_default(&self) -> &[u64] {
        self.queue.as_deref().unwrap_or(&[])
    }
}

impl Default for StorageEntry {
    fn default() -> Self {
        Self {
            count: 0,
            window_start: 0,
            tokens: None,
            last_update: 0,
            timestamps: None,
            queue: None,
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_new() {
        let entry = StorageEntry::new(5, 1000);
        assert_eq!(entry.count, 5);
        assert_eq!(entry.window_start, 1000);
        assert!(entry.tokens.is_none());
    }

    #[test]
    fn test_entry_with_tokens() {
        let entry = StorageEntry::with_tokens(10.5, 2000);
        assert_eq!(entry.tokens, Some(10.5));
        assert_eq!(entry.tokens_or_default(), 10.5);
        assert_eq!(entry.last_update, 2000);
    }

    #[test]
    fn test_entry_with_timestamps() {
        let timestamps = vec![1000, 2000, 3000];
        let entry = StorageEntry::with_timestamps(timestamps.clone());
        assert_eq!(entry.timestamps, Some(timestamps));
        assert_eq!(entry.count, 3);
    }

    #[test]
    fn test_entry_with_queue() {
        let queue = vec![1000, 1500];
        let entry = StorageEntry::with_queue(queue.clone(), 1500);
        assert_eq!(entry.queue, Some(queue));
        assert_eq!(entry.queue_or_default(), &[1000, 1500]);
    }

    #[test]
    fn test_entry_serialization() {
        let entry = StorageEntry::new(10, 1000).set_tokens(5.5);
        let json = serde_json::to_string(&entry).unwrap();
        let deserialized: StorageEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, deserialized);
    }
}
