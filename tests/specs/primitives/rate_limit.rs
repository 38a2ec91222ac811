//! Rate limiter specs
//!
//! Fixed windows per identity; over-limit requests are denied until the
//! window rolls over.

use crate::prelude::*;
use crate::prelude::assert_eq;

#[test]
fn sixth_request_in_window_is_denied() {
    let clock = FakeClock::new();
    let limiter = limiter(Duration::from_secs(60), 5, &clock);

    for _ in 0..5 {
        assert!(limiter.check("tenant-a", "LOCK.ACQUIRE"));
    }
    assert!(!limiter.check("tenant-a", "LOCK.ACQUIRE"));

    clock.advance(Duration::from_secs(61));
    assert!(limiter.check("tenant-a", "LOCK.ACQUIRE"));
    assert_eq!(limiter.usage("tenant-a").unwrap().count, 1);
}

#[test]
fn identities_are_counted_separately() {
    let clock = FakeClock::new();
    let limiter = limiter(Duration::from_secs(60), 1, &clock);

    assert!(limiter.check("tenant-a", "PING"));
    assert!(!limiter.check("tenant-a", "PING"));
    assert!(limiter.check("tenant-b", "PING"));
}

#[test]
fn full_table_evicts_least_recent_identity() {
    let clock = FakeClock::new();
    let limiter = RateLimiter::with_clock(
        &RateLimitConfig {
            max_requests: 1,
            capacity: 2,
            on_full: SaturationPolicy::EvictLeastRecent,
            ..RateLimitConfig::default()
        },
        clock.clone(),
    );

    assert!(limiter.check("a", "PING"));
    assert!(limiter.check("b", "PING"));
    assert!(limiter.check("c", "PING"));

    assert_eq!(limiter.tracked(), 2);
    // "a" was evicted, so it starts a fresh window
    assert!(limiter.check("a", "PING"));
}

#[test]
fn full_table_fails_open_by_default() {
    let clock = FakeClock::new();
    let limiter = RateLimiter::with_clock(
        &RateLimitConfig {
            max_requests: 1,
            capacity: 1,
            ..RateLimitConfig::default()
        },
        clock.clone(),
    );

    assert!(limiter.check("a", "PING"));
    assert!(limiter.check("b", "PING"));
    assert!(limiter.check("b", "PING"));

    // "a" keeps its window; rotating identities does not reset it
    assert!(!limiter.check("a", "PING"));
    assert_eq!(limiter.tracked(), 1);
}

#[test]
fn disabled_limiter_admits_everything() {
    let clock = FakeClock::new();
    let limiter = limiter(Duration::from_secs(60), 1, &clock);
    limiter.set_enabled(false);

    for _ in 0..10 {
        assert!(limiter.check("tenant-a", "PING"));
    }
    assert_eq!(limiter.tracked(), 0);
}
