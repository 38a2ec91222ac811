//! Cache stampede guard specs
//!
//! One LOAD per key per build-lock lifetime; everyone else WAITs until the
//! value is written or the build lock expires.

use crate::prelude::*;
use crate::prelude::assert_eq;

#[tokio::test]
async fn exactly_one_caller_loads() {
    let guard = Arc::new(CacheStampedeGuard::new(MemoryStore::new()));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let guard = Arc::clone(&guard);
        handles.push(tokio::spawn(async move {
            guard
                .request_build("user:42", Duration::from_secs(30))
                .await
                .unwrap()
        }));
    }

    let mut loads = 0;
    for handle in handles {
        if handle.await.unwrap() == BuildDecision::Load {
            loads += 1;
        }
    }
    assert_eq!(loads, 1);
}

#[tokio::test]
async fn complete_publishes_value_and_frees_the_key() {
    let w = World::new();
    let ttl = Duration::from_secs(30);
    assert_eq!(w.cache.request_build("user:42", ttl).await.unwrap(), BuildDecision::Load);
    assert_eq!(w.cache.request_build("user:42", ttl).await.unwrap(), BuildDecision::Wait);

    w.cache.complete("user:42", "{\"name\":\"ada\"}", Duration::from_secs(300)).await.unwrap();

    assert_eq!(
        w.cache.read("user:42").await.unwrap().as_deref(),
        Some("{\"name\":\"ada\"}")
    );
    assert_eq!(w.cache.request_build("user:42", ttl).await.unwrap(), BuildDecision::Load);
}

#[tokio::test]
async fn abandoned_build_expires() {
    let w = World::new();
    let ttl = Duration::from_secs(30);
    assert_eq!(w.cache.request_build("report", ttl).await.unwrap(), BuildDecision::Load);

    w.clock.advance(Duration::from_secs(29));
    assert_eq!(w.cache.request_build("report", ttl).await.unwrap(), BuildDecision::Wait);

    w.clock.advance(Duration::from_secs(1));
    assert_eq!(w.cache.request_build("report", ttl).await.unwrap(), BuildDecision::Load);
}

#[tokio::test]
async fn build_lock_shares_the_lock_keyspace() {
    let w = World::new();
    assert!(w.locks.acquire("report", "t1", Duration::from_secs(30)).await.unwrap());

    assert_eq!(
        w.cache.request_build("report", Duration::from_secs(30)).await.unwrap(),
        BuildDecision::Wait
    );
}

#[tokio::test]
async fn cached_value_expires() {
    let w = World::new();
    w.cache.complete("k", "v", Duration::from_secs(5)).await.unwrap();

    w.clock.advance(Duration::from_secs(5));

    assert_eq!(w.cache.read("k").await.unwrap(), None);
}
