//! Task queue specs
//!
//! Competing consumers never share a delivery; ack removes from pending;
//! retries hop streams until the retry budget runs out.

use crate::prelude::*;
use crate::prelude::assert_eq;

fn no_cancel() -> CancellationToken {
    CancellationToken::new()
}

fn retry_request(id: EntryId, retry_count: u32) -> RetryRequest {
    RetryRequest {
        stream: "jobs".to_string(),
        id,
        payload: "resize:7".to_string(),
        retry_count,
        retry_stream: "jobs:retry".to_string(),
        dead_letter_stream: "jobs:dead".to_string(),
        max_retries: 3,
    }
}

#[tokio::test]
async fn publish_consume_ack_lifecycle() {
    let w = World::new();
    let id = w.queue.publish("jobs", "p1", 0).await.unwrap();

    let first = w.queue.consume("g1", "w1", "jobs", 10, Duration::ZERO, &no_cancel()).await.unwrap();
    let second = w.queue.consume("g1", "w2", "jobs", 10, Duration::ZERO, &no_cancel()).await.unwrap();

    assert_eq!(first.iter().map(|e| e.id).collect::<Vec<_>>(), vec![id]);
    assert_eq!(first[0].payload, "p1");
    assert_eq!(first[0].retry_count, 0);
    assert!(second.is_empty());
    assert_eq!(w.queue.ack("jobs", "g1", id).await.unwrap(), 1);
    assert_eq!(w.queue.ack("jobs", "g1", id).await.unwrap(), 0);
}

#[tokio::test]
async fn ids_increase_within_a_stream() {
    let w = World::new();

    let a = w.queue.publish("jobs", "a", 0).await.unwrap();
    let b = w.queue.publish("jobs", "b", 0).await.unwrap();
    w.clock.advance(Duration::from_millis(5));
    let c = w.queue.publish("jobs", "c", 0).await.unwrap();

    assert!(a < b);
    assert!(b < c);
}

#[tokio::test]
async fn concurrent_consumers_never_share_an_entry() {
    let store = MemoryStore::new();
    let queue = Arc::new(TaskQueue::new(store));
    for i in 0..5 {
        queue.publish("jobs", &format!("p{i}"), 0).await.unwrap();
    }

    let c1 = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            queue.consume("g", "c1", "jobs", 5, Duration::ZERO, &CancellationToken::new()).await
        })
    };
    let c2 = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            queue.consume("g", "c2", "jobs", 5, Duration::ZERO, &CancellationToken::new()).await
        })
    };

    let mut ids: Vec<EntryId> = c1.await.unwrap().unwrap().into_iter().map(|e| e.id).collect();
    let other: Vec<EntryId> = c2.await.unwrap().unwrap().into_iter().map(|e| e.id).collect();
    let total = ids.len() + other.len();
    ids.extend(other);
    ids.sort();
    ids.dedup();

    assert_eq!(total, 5);
    assert_eq!(ids.len(), 5);
}

#[tokio::test]
async fn groups_consume_independently() {
    let w = World::new();
    w.queue.publish("jobs", "p1", 0).await.unwrap();

    let billing = w.queue.consume("billing", "w1", "jobs", 1, Duration::ZERO, &no_cancel()).await.unwrap();
    let audit = w.queue.consume("audit", "w1", "jobs", 1, Duration::ZERO, &no_cancel()).await.unwrap();

    assert_eq!(billing.len(), 1);
    assert_eq!(audit.len(), 1);
    assert_eq!(billing[0].id, audit[0].id);
}

#[tokio::test]
async fn retries_hop_until_dead_lettered() {
    let w = World::new();
    let id = w.queue.publish("jobs", "resize:7", 0).await.unwrap();

    let first = w.queue.retry(&retry_request(id, 0)).await.unwrap();
    let RetryOutcome::Retried { stream, retry_count, .. } = &first else {
        panic!("expected retry, got {:?}", first);
    };
    assert_eq!(stream, "jobs:retry");
    assert_eq!(*retry_count, 1);

    let last = w.queue.retry(&retry_request(first.id(), 2)).await.unwrap();
    let RetryOutcome::DeadLettered { stream, retry_count, .. } = &last else {
        panic!("expected dead letter, got {:?}", last);
    };
    assert_eq!(stream, "jobs:dead");
    assert_eq!(*retry_count, 3);

    let dead = w.queue.consume("ops", "w1", "jobs:dead", 10, Duration::ZERO, &no_cancel()).await.unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].payload, "resize:7");
    assert_eq!(dead[0].retry_count, 3);
    assert_eq!(dead[0].original_id, Some(first.id()));
}

#[tokio::test]
async fn blocking_consume_wakes_on_publish() {
    let store = MemoryStore::new();
    let queue = Arc::new(TaskQueue::new(store));

    let waiter = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            queue
                .consume("g", "w1", "jobs", 1, Duration::from_secs(5), &CancellationToken::new())
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let id = queue.publish("jobs", "late", 0).await.unwrap();

    let delivered = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("consume should wake")
        .unwrap()
        .unwrap();
    assert_eq!(delivered.iter().map(|e| e.id).collect::<Vec<_>>(), vec![id]);
}

#[tokio::test]
async fn blocking_consume_returns_empty_when_cancelled() {
    let queue = TaskQueue::new(MemoryStore::new());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let delivered = queue
        .consume("g", "w1", "jobs", 1, Duration::from_secs(30), &cancel)
        .await
        .unwrap();

    assert!(delivered.is_empty());
}

#[tokio::test]
async fn idle_entries_can_be_claimed() {
    let w = World::new();
    let id = w.queue.publish("jobs", "p1", 0).await.unwrap();
    w.queue.consume("g", "crashed", "jobs", 1, Duration::ZERO, &no_cancel()).await.unwrap();

    w.clock.advance(Duration::from_secs(60));
    let claimed = w.queue.claim_idle("jobs", "g", "rescuer", Duration::from_secs(30), 10).await.unwrap();

    assert_eq!(claimed.iter().map(|e| e.id).collect::<Vec<_>>(), vec![id]);
    let pending = w.queue.pending("jobs", "g").await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].consumer, "rescuer");
    assert_eq!(pending[0].delivery_count, 2);
}
