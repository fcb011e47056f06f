//! Algorithm comparison example.
//!
//! Run with:
//! ```
//! cargo run -p ratelimit-core --example algorithms --features "memory all-algorithms"
//! ```

use ratelimit_core::{
    Algorithm, FixedWindow, LeakingBucket, MemoryStorage, Quota, SlidingWindowCounter,
    SlidingWindowLog, SystemClock, TokenBucket,
};
use ratelimit_core::clock::Clock;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let quota = Quota::per_second(5).with_bucket_size(8);
    let clock = SystemClock::new();

    println!("=== Algorithm Comparison Demo ===\n");
    println!("Quota: 5 requests/second, burst capacity: 8\n");

    test_algorithm("Token Bucket", TokenBucket::new(), &quota, &clock).await?;
    test_algorithm("Leaking Bucket", LeakingBucket::new(), &quota, &clock).await?;
    test_algorithm("Sliding Window Log", SlidingWindowLog::new(), &quota, &clock).await?;
    test_algorithm(
        "Sliding Window Counter",
        SlidingWindowCounter::new(),
        &quota,
        &clock,
    )
    .await?;
    test_algorithm("Fixed Window", FixedWindow::new(), &quota, &clock).await?;

    println!("\n=== Algorithm Characteristics ===\n");
    println!("| Algorithm              | Memory | Burst Handling | Best For              |");
    println!("|-------------------------|--------|-----------------|------------------------|");
    println!("| Token Bucket           | Low    | Excellent       | Bursty traffic         |");
    println!("| Leaking Bucket         | Medium | None            | Smooth backend load    |");
    println!("| Sliding Window Log     | High   | Excellent       | Precision critical     |");
    println!("| Sliding Window Counter | Low    | Good            | General purpose        |");
    println!("| Fixed Window           | Low    | Poor            | Simple use cases       |");

    Ok(())
}

async fn test_algorithm<A: Algorithm>(
    name: &str,
    algorithm: A,
    quota: &Quota,
    clock: &SystemClock,
) -> Result<(), Box<dyn std::error::Error>> {
    let storage = MemoryStorage::new();
    let key = format!("test:{}", name.to_lowercase().replace(' ', "_"));

    print!("{:23} | ", name);

    let mut results = Vec::new();
    for _ in 0..8 {
        let decision = algorithm
            .check_and_record(&storage, &key, quota, clock.now_ms())
            .await?;
        results.push(if decision.is_allowed() { "allow" } else { "deny " });
    }

    println!("{}", results.join(" "));
    Ok(())
}
