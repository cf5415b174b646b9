// ==============================
// tests/unit/rate_limit_tests.rs
// ==============================
//! Token bucket behaviour of `RateLimiter`
use authgate_backend::auth::RateLimiter;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_rate_limiter_allows_burst_then_rejects() {
    let limiter = RateLimiter::new(1.0, 5);
    let now = Instant::now();

    for _ in 0..5 {
        assert!(limiter.allow("127.0.0.1", now));
    }
    assert!(!limiter.allow("127.0.0.1", now));
}

#[test]
fn test_rate_limiter_refills_over_time() {
    let limiter = RateLimiter::new(1.0, 5);
    let start = Instant::now();
    for _ in 0..5 {
        assert!(limiter.allow("127.0.0.1", start));
    }

    let later = start + Duration::from_secs(1);
    assert!(limiter.allow("127.0.0.1", later));
    assert!(!limiter.allow("127.0.0.1", later));

    // never refills past capacity
    let much_later = start + Duration::from_secs(3600);
    for _ in 0..5 {
        assert!(limiter.allow("127.0.0.1", much_later));
    }
    assert!(!limiter.allow("127.0.0.1", much_later));
}

#[test]
fn test_different_clients_tracked_separately() {
    let limiter = RateLimiter::new(1.0, 2);
    let now = Instant::now();

    assert!(limiter.allow("10.0.0.1", now));
    assert!(limiter.allow("10.0.0.1", now));
    assert!(!limiter.allow("10.0.0.1", now));

    assert!(limiter.allow("10.0.0.2", now));
    assert_eq!(limiter.len(), 2);
}

#[test]
fn test_concurrent_first_requests_share_one_bucket() {
    let limiter = Arc::new(RateLimiter::new(0.001, 5));
    let now = Instant::now();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            thread::spawn(move || limiter.allow("198.51.100.7", now))
        })
        .collect();
    let admitted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|allowed| *allowed)
        .count();

    assert_eq!(admitted, 5);
    assert_eq!(limiter.len(), 1);
}

#[test]
fn test_idle_buckets_are_evicted() {
    let limiter = RateLimiter::new(1.0, 5);
    let start = Instant::now();
    limiter.allow("10.0.0.1", start);
    limiter.allow("10.0.0.2", start + Duration::from_secs(4));

    // the first bucket has been idle long enough to be full again
    let removed = limiter.evict_idle(start + Duration::from_secs(6));
    assert_eq!(removed, 1);
    assert_eq!(limiter.len(), 1);
}
