//! Composite key example - rate limit by multiple factors.
//!
//! Run with:
//! ```
//! cargo run -p ratelimit-core --example composite_keys --features "memory token-bucket"
//! ```

use ratelimit_core::{
    key::{CompositeKey, Key},
    Algorithm, MemoryStorage, Quota, SystemClock, TokenBucket,
};
use ratelimit_core::clock::Clock;

/// Simple mock request for demonstration
struct MockRequest {
    ip: String,
    path: String,
}

/// Custom key extractor for IP
struct IpExtractor;

impl Key<MockRequest> for IpExtractor {
    fn extract(&self, request: &MockRequest) -> Option<String> {
        Some(format!("ip:{}", request.ip))
    }

    fn name(&self) -> &'static str {
        "ip"
    }
}

/// Custom key extractor for path
struct PathExtractor;

impl Key<MockRequest> for PathExtractor {
    fn extract(&self, request: &MockRequest) -> Option<String> {
        Some(format!("path:{}", request.path))
    }

    fn name(&self) -> &'static str {
        "path"
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let storage = MemoryStorage::new();
    let algorithm = TokenBucket::new();
    let clock = SystemClock::new();

    // Composite key: IP + Path, so limits track per (IP, path) combination.
    let key_extractor = CompositeKey::new(IpExtractor, PathExtractor);

    let quota = Quota::per_minute(5);

    println!("=== Composite Key Rate Limiting Demo ===\n");
    println!("Quota: 5 requests per minute per (IP + Path) combination\n");

    let scenarios = vec![
        ("192.168.1.1", "/api/users", 3), // Same combo
        ("192.168.1.1", "/api/posts", 3), // Same IP, different path
        ("192.168.1.2", "/api/users", 3), // Different IP, same path
        ("192.168.1.1", "/api/users", 5), // Back to first combo - should hit limit
    ];

    for (ip, path, count) in scenarios {
        let request = MockRequest {
            ip: ip.to_string(),
            path: path.to_string(),
        };

        let key = key_extractor.extract(&request).unwrap_or_default();
        println!("Requests from {} to {} (key: {}):", ip, path, key);

        for i in 1..=count {
            let decision = algorithm
                .check_and_record(&storage, &key, &quota, clock.now_ms())
                .await?;

            if decision.is_allowed() {
                print!("  Request {}: allow ", i);
            } else {
                print!("  Request {}: deny  ", i);
            }
            println!("(remaining: {})", decision.info().remaining);
        }
        println!();
    }

    Ok(())
}
