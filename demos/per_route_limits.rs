//! Per-route rate limiting example, using `RateLimitManager`.
//!
//! Run with:
//! ```
//! cargo run -p ratelimit-core --example per_route_limits --features "memory token-bucket"
//! ```

use ratelimit_core::{key::GlobalKey, MemoryStorage, Quota, RateLimitManager, SystemClock, TokenBucket};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let storage = MemoryStorage::new();

    let manager = RateLimitManager::builder()
        .default_quota(Quota::per_minute(100))
        .route("/api/search", Quota::per_minute(30))
        .route("/api/auth/login", Quota::per_minute(5))
        .route_pattern("/api/users/*", Quota::per_second(20))
        .build_with_key(TokenBucket::new(), storage, GlobalKey, SystemClock::new());

    println!("=== Per-Route Rate Limiting Demo ===\n");

    let routes = vec![
        ("/api/data", 5),         // Uses default quota (100/min)
        ("/api/search", 35),      // 30/min limit - should deny some
        ("/api/auth/login", 7),   // 5/min limit - should deny some
        ("/api/users/42", 25),    // 20/sec limit via pattern match
    ];

    for (route, count) in routes {
        println!("Route: {} (sending {} requests)", route, count);

        let mut allowed = 0;
        let mut denied = 0;

        for _ in 0..count {
            let decision = manager.check_and_record(route, &()).await?;

            if decision.is_allowed() {
                allowed += 1;
            } else {
                denied += 1;
            }
        }

        println!("  Allowed: {}, Denied: {}\n", allowed, denied);
    }

    Ok(())
}
