// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use herd_core::{FakeClock, RateLimitConfig};
use herd_store::FakeStore;

fn coordinator(max_requests: u64) -> (Coordinator<FakeStore, FakeClock>, FakeStore) {
    let store = FakeStore::new();
    let clock = store.clock().clone();
    let limiters = Limiters::with_clock(
        &RateLimitConfig {
            max_requests,
            ..RateLimitConfig::default()
        },
        clock.clone(),
    );
    let coordinator = Coordinator::new(
        store.clone(),
        clock,
        limiters,
        QueueConfig::default(),
        CancellationToken::new(),
    );
    (coordinator, store)
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn reply(response: Response) -> Reply {
    match response {
        Response::Reply { reply } => reply,
        other => panic!("expected reply, got {:?}", other),
    }
}

#[tokio::test]
async fn lock_commands_round_trip() {
    let (coord, _) = coordinator(100);

    let acquire = args(&["LOCK.ACQUIRE", "deploy", "t1", "5000"]);
    assert_eq!(reply(coord.handle("c", &acquire).await), Reply::Bool(true));
    assert_eq!(reply(coord.handle("c", &acquire).await), Reply::Bool(false));
    assert_eq!(
        reply(coord.handle("c", &args(&["lock.holder", "deploy"])).await),
        Reply::Text("t1".to_string())
    );
    assert_eq!(
        reply(coord.handle("c", &args(&["LOCK.EXTEND", "deploy", "t2", "5000"])).await),
        Reply::Bool(false)
    );
    assert_eq!(
        reply(coord.handle("c", &args(&["LOCK.RELEASE", "deploy", "t1"])).await),
        Reply::Bool(true)
    );
    assert_eq!(
        reply(coord.handle("c", &args(&["LOCK.HOLDER", "deploy"])).await),
        Reply::Nil
    );
}

#[tokio::test]
async fn cache_commands_round_trip() {
    let (coord, _) = coordinator(100);

    assert_eq!(
        reply(coord.handle("c", &args(&["CACHE.LOCK", "page", "5000", "30000"])).await),
        Reply::Text("LOAD".to_string())
    );
    assert_eq!(
        reply(coord.handle("c", &args(&["CACHE.LOCK", "page", "5000", "30000"])).await),
        Reply::Text("WAIT".to_string())
    );
    assert_eq!(
        reply(coord.handle("c", &args(&["CACHE.SET", "page", "<html>", "60000"])).await),
        Reply::Ok
    );
    assert_eq!(
        reply(coord.handle("c", &args(&["CACHE.GET", "page"])).await),
        Reply::Text("<html>".to_string())
    );
    assert_eq!(
        reply(coord.handle("c", &args(&["CACHE.GET", "other"])).await),
        Reply::Nil
    );
}

#[tokio::test]
async fn task_commands_round_trip() {
    let (coord, _) = coordinator(100);

    let Reply::Id(id) = reply(coord.handle("c", &args(&["TASK.PUBLISH", "jobs", "p1"])).await) else {
        panic!("expected id");
    };
    let Reply::Entries(entries) =
        reply(coord.handle("c", &args(&["TASK.CONSUME", "g", "w1", "jobs"])).await)
    else {
        panic!("expected entries");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, id);

    let Reply::Pending(pending) =
        reply(coord.handle("c", &args(&["TASK.PENDING", "jobs", "g"])).await)
    else {
        panic!("expected pending");
    };
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].consumer, "w1");

    let retry = args(&[
        "TASK.RETRY", "jobs", &id.to_string(), "p1", "0", "jobs:retry", "jobs:dead", "3",
    ]);
    assert_eq!(reply(coord.handle("c", &retry).await), Reply::Ok);

    let ack = args(&["TASK.ACK", "jobs", "g", &id.to_string()]);
    assert_eq!(reply(coord.handle("c", &ack).await), Reply::Int(1));
    assert_eq!(reply(coord.handle("c", &ack).await), Reply::Int(0));

    let Reply::Entries(retried) =
        reply(coord.handle("c", &args(&["TASK.CONSUME", "g", "w1", "jobs:retry", "10"])).await)
    else {
        panic!("expected entries");
    };
    assert_eq!(retried.len(), 1);
    assert_eq!(retried[0].retry_count, 1);
    assert_eq!(retried[0].original_id, Some(id));
}

#[tokio::test]
async fn claim_command_takes_over_idle_task() {
    let (coord, store) = coordinator(100);
    coord.handle("c", &args(&["TASK.PUBLISH", "jobs", "p1"])).await;
    coord.handle("c", &args(&["TASK.CONSUME", "g", "w1", "jobs"])).await;
    store.clock().advance(std::time::Duration::from_secs(10));

    let Reply::Entries(claimed) =
        reply(coord.handle("c", &args(&["TASK.CLAIM", "jobs", "g", "w2", "5000"])).await)
    else {
        panic!("expected entries");
    };
    assert_eq!(claimed.len(), 1);
}

#[tokio::test]
async fn invalid_arguments_are_validation_errors_without_backend_calls() {
    let (coord, store) = coordinator(100);

    let response = coord
        .handle("c", &args(&["LOCK.ACQUIRE", "deploy", "t1", "-5"]))
        .await;

    assert!(matches!(
        response,
        Response::Error { kind: ErrorKind::Validation, .. }
    ));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn unknown_command_is_a_validation_error() {
    let (coord, _) = coordinator(100);
    let response = coord.handle("c", &args(&["FLUSHALL"])).await;
    assert!(matches!(
        response,
        Response::Error { kind: ErrorKind::Validation, ref message } if message.contains("FLUSHALL")
    ));
}

#[tokio::test]
async fn backend_outage_is_reported_distinctly() {
    let (coord, store) = coordinator(100);
    store.set_unavailable(true);

    let response = coord
        .handle("c", &args(&["LOCK.ACQUIRE", "deploy", "t1", "5000"]))
        .await;

    assert!(matches!(
        response,
        Response::Error { kind: ErrorKind::BackendUnavailable, .. }
    ));
}

#[tokio::test]
async fn key_of_wrong_type_is_not_reported_as_outage() {
    let (coord, _) = coordinator(100);
    coord
        .handle("c", &args(&["LOCK.ACQUIRE", "jobs", "t1", "5000"]))
        .await;

    let response = coord
        .handle("c", &args(&["TASK.PUBLISH", "lock:jobs", "p1"]))
        .await;

    assert_eq!(
        response,
        Response::Error {
            kind: ErrorKind::WrongType,
            message: "key 'lock:jobs' holds a value of the wrong type".to_string(),
        }
    );
}

#[tokio::test]
async fn requests_over_limit_are_rejected_before_parsing() {
    let (coord, store) = coordinator(2);
    let ping = args(&["PING"]);

    assert_eq!(reply(coord.handle("alice", &ping).await), Reply::Text("PONG".to_string()));
    assert_eq!(reply(coord.handle("alice", &ping).await), Reply::Text("PONG".to_string()));
    let response = coord
        .handle("alice", &args(&["LOCK.ACQUIRE", "deploy", "t1", "5000"]))
        .await;

    assert!(matches!(
        response,
        Response::Error { kind: ErrorKind::RateLimited, .. }
    ));
    assert!(store.calls().is_empty());
    assert_eq!(reply(coord.handle("bob", &ping).await), Reply::Text("PONG".to_string()));
}

#[tokio::test]
async fn rate_check_command_counts_against_named_identity() {
    let (coord, _) = coordinator(1);

    let check = args(&["RATE.CHECK", "api-key-1", "search"]);
    assert_eq!(reply(coord.handle("c1", &check).await), Reply::Bool(true));
    assert_eq!(reply(coord.handle("c2", &check).await), Reply::Bool(false));
}

#[tokio::test]
async fn rate_check_is_not_spent_by_admission_of_same_identity() {
    let (coord, _) = coordinator(5);
    let check = args(&["RATE.CHECK", "tenant-a", "upload"]);

    let mut replies = Vec::new();
    for _ in 0..5 {
        replies.push(reply(coord.handle("tenant-a", &check).await));
    }
    assert_eq!(replies, vec![Reply::Bool(true); 5]);

    // A sixth check from another connection is admitted, then denied
    assert_eq!(reply(coord.handle("conn-2", &check).await), Reply::Bool(false));
}

#[tokio::test]
async fn shutdown_token_releases_blocked_consume() {
    let store = FakeStore::new();
    let clock = store.clock().clone();
    let shutdown = CancellationToken::new();
    let coord = Coordinator::new(
        store,
        clock.clone(),
        Limiters::with_clock(&RateLimitConfig::default(), clock),
        QueueConfig::default(),
        shutdown.clone(),
    );

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        trigger.cancel();
    });
    let response = coord
        .handle("c", &args(&["TASK.CONSUME", "g", "w", "jobs", "1", "20000"]))
        .await;

    assert_eq!(reply(response), Reply::Entries(Vec::new()));
}
