//! Lock manager specs
//!
//! At most one live holder per name; only the holder's token releases or
//! extends it.

use crate::prelude::*;
use crate::prelude::assert_eq;

#[tokio::test]
async fn concurrent_acquire_grants_exactly_one() {
    let locks = Arc::new(LockManager::new(MemoryStore::new()));

    let mut handles = Vec::new();
    for i in 0..16 {
        let locks = Arc::clone(&locks);
        handles.push(tokio::spawn(async move {
            locks
                .acquire("deploy", &format!("t{i}"), Duration::from_secs(10))
                .await
                .unwrap()
        }));
    }

    let mut granted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            granted += 1;
        }
    }
    assert_eq!(granted, 1);
}

#[tokio::test]
async fn release_with_wrong_token_leaves_lock_untouched() {
    let w = World::new();
    assert!(w.locks.acquire("deploy", "t1", Duration::from_secs(10)).await.unwrap());

    assert!(!w.locks.release("deploy", "t2").await.unwrap());

    assert_eq!(w.locks.holder("deploy").await.unwrap().as_deref(), Some("t1"));
    assert!(!w.locks.acquire("deploy", "t2", Duration::from_secs(10)).await.unwrap());
}

#[tokio::test]
async fn extend_never_steals_or_creates() {
    let w = World::new();

    assert!(!w.locks.extend("deploy", "t1", Duration::from_secs(10)).await.unwrap());
    assert_eq!(w.locks.holder("deploy").await.unwrap(), None);

    assert!(w.locks.acquire("deploy", "t1", Duration::from_secs(10)).await.unwrap());
    assert!(!w.locks.extend("deploy", "t2", Duration::from_secs(60)).await.unwrap());

    // t1's original expiry still applies
    w.clock.advance(Duration::from_secs(11));
    assert_eq!(w.locks.holder("deploy").await.unwrap(), None);
}

#[tokio::test]
async fn holder_can_extend_past_original_expiry() {
    let w = World::new();
    assert!(w.locks.acquire("deploy", "t1", Duration::from_secs(10)).await.unwrap());

    w.clock.advance(Duration::from_secs(8));
    assert!(w.locks.extend("deploy", "t1", Duration::from_secs(10)).await.unwrap());
    w.clock.advance(Duration::from_secs(8));

    assert_eq!(w.locks.holder("deploy").await.unwrap().as_deref(), Some("t1"));
    assert!(w.locks.release("deploy", "t1").await.unwrap());
    assert!(w.locks.acquire("deploy", "t2", Duration::from_secs(10)).await.unwrap());
}

#[tokio::test]
async fn expired_lock_is_free_again() {
    let w = World::new();
    assert!(w.locks.acquire("deploy", "t1", Duration::from_secs(10)).await.unwrap());

    w.clock.advance(Duration::from_secs(10));

    assert!(w.locks.acquire("deploy", "t2", Duration::from_secs(10)).await.unwrap());
    assert!(!w.locks.release("deploy", "t1").await.unwrap());
}

#[tokio::test]
async fn backend_failure_is_not_a_denial() {
    let w = World::new();
    w.store.set_unavailable(true);

    let result = w.locks.acquire("deploy", "t1", Duration::from_secs(10)).await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::BackendUnavailable);
}
