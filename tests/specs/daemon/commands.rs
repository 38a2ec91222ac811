//! Daemon command specs
//!
//! The coordination commands driven over the socket protocol.

use crate::prelude::*;
use crate::prelude::assert_eq;

#[tokio::test]
async fn lock_commands() {
    let daemon = Daemon::start().await;
    let mut conn = daemon.connect().await;

    assert_eq!(conn.ok(&["LOCK.ACQUIRE", "deploy", "t1", "10000"]).await, Reply::Bool(true));
    assert_eq!(conn.ok(&["LOCK.ACQUIRE", "deploy", "t2", "10000"]).await, Reply::Bool(false));
    assert_eq!(conn.ok(&["LOCK.RELEASE", "deploy", "t2"]).await, Reply::Bool(false));
    assert_eq!(conn.ok(&["lock.holder", "deploy"]).await, Reply::Text("t1".to_string()));
    assert_eq!(conn.ok(&["LOCK.EXTEND", "deploy", "t1", "10000"]).await, Reply::Bool(true));
    assert_eq!(conn.ok(&["LOCK.RELEASE", "deploy", "t1"]).await, Reply::Bool(true));
    assert_eq!(conn.ok(&["LOCK.HOLDER", "deploy"]).await, Reply::Nil);

    daemon.stop().await;
}

#[tokio::test]
async fn cache_commands() {
    let daemon = Daemon::start().await;
    let mut conn = daemon.connect().await;

    assert_eq!(conn.ok(&["CACHE.LOCK", "user:1", "30000", "5000"]).await, Reply::Text("LOAD".to_string()));
    assert_eq!(conn.ok(&["CACHE.LOCK", "user:1", "30000", "5000"]).await, Reply::Text("WAIT".to_string()));
    assert_eq!(conn.ok(&["CACHE.GET", "user:1"]).await, Reply::Nil);
    assert_eq!(conn.ok(&["CACHE.SET", "user:1", "ada", "60000"]).await, Reply::Ok);
    assert_eq!(conn.ok(&["CACHE.GET", "user:1"]).await, Reply::Text("ada".to_string()));
    assert_eq!(conn.ok(&["CACHE.LOCK", "user:1", "30000", "5000"]).await, Reply::Text("LOAD".to_string()));

    daemon.stop().await;
}

#[tokio::test]
async fn task_commands() {
    let daemon = Daemon::start().await;
    let mut conn = daemon.connect().await;

    let Reply::Id(id) = conn.ok(&["TASK.PUBLISH", "jobs", "p1"]).await else {
        panic!("publish should return an id");
    };
    let id = id.to_string();

    let Reply::Entries(entries) = conn.ok(&["TASK.CONSUME", "g1", "w1", "jobs", "10"]).await else {
        panic!("consume should return entries");
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].payload, "p1");
    assert_eq!(conn.ok(&["TASK.CONSUME", "g1", "w2", "jobs", "10"]).await, Reply::Entries(Vec::new()));

    let Reply::Pending(pending) = conn.ok(&["TASK.PENDING", "jobs", "g1"]).await else {
        panic!("pending should return pending entries");
    };
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].consumer, "w1");

    assert_eq!(conn.ok(&["TASK.ACK", "jobs", "g1", &id]).await, Reply::Int(1));
    assert_eq!(conn.ok(&["TASK.ACK", "jobs", "g1", &id]).await, Reply::Int(0));

    assert_eq!(
        conn.ok(&["TASK.RETRY", "jobs", &id, "p1", "2", "jobs:retry", "jobs:dead", "3"]).await,
        Reply::Ok
    );
    let Reply::Entries(dead) = conn.ok(&["TASK.CONSUME", "ops", "w1", "jobs:dead"]).await else {
        panic!("consume should return entries");
    };
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].retry_count, 3);

    daemon.stop().await;
}

#[tokio::test]
async fn rate_check_command() {
    let daemon = Daemon::start_with(HerdConfig {
        rate_limit: RateLimitConfig {
            max_requests: 5,
            ..RateLimitConfig::default()
        },
        ..HerdConfig::default()
    })
    .await;
    let mut tenant = daemon.connect().await;
    let mut other = daemon.connect().await;
    let check = ["RATE.CHECK", "tenant-a", "upload"];

    // Checking your own identity spends one slot per check, not two
    for _ in 0..5 {
        assert_eq!(
            tenant.cmd_as(Some("tenant-a"), &check).await,
            Response::Reply { reply: Reply::Bool(true) }
        );
    }
    assert_eq!(other.ok(&check).await, Reply::Bool(false));

    // Admission has its own budget per connection
    assert_eq!(
        tenant.cmd_as(Some("tenant-a"), &["PING"]).await,
        Response::Error {
            kind: ErrorKind::RateLimited,
            message: "rate limit exceeded for 'tenant-a'".to_string(),
        }
    );

    daemon.stop().await;
}

#[tokio::test]
async fn malformed_commands_are_validation_errors() {
    let daemon = Daemon::start().await;
    let mut conn = daemon.connect().await;

    assert_eq!(conn.error_kind(&["LOCK.ACQUIRE", "deploy", "t1"]).await, ErrorKind::Validation);
    assert_eq!(conn.error_kind(&["LOCK.ACQUIRE", "deploy", "t1", "0"]).await, ErrorKind::Validation);
    assert_eq!(conn.error_kind(&["LOCK.ACQUIRE", "deploy", "t1", "soon"]).await, ErrorKind::Validation);
    assert_eq!(conn.error_kind(&["TASK.CONSUME", "g", "w", "jobs", "0"]).await, ErrorKind::Validation);
    assert_eq!(conn.error_kind(&["TASK.ACK", "jobs", "g", "not-an-id"]).await, ErrorKind::Validation);
    assert_eq!(conn.error_kind(&["FLUSHALL"]).await, ErrorKind::Validation);

    daemon.stop().await;
}

#[tokio::test]
async fn blocked_consumer_is_woken_by_publish_on_another_connection() {
    let daemon = Daemon::start().await;
    let mut consumer = daemon.connect().await;
    let mut producer = daemon.connect().await;

    let blocked = tokio::spawn(async move {
        consumer.ok(&["TASK.CONSUME", "g", "w1", "jobs", "1", "5000"]).await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    producer.ok(&["TASK.PUBLISH", "jobs", "wake"]).await;

    let reply = tokio::time::timeout(Duration::from_secs(5), blocked)
        .await
        .expect("consumer should wake")
        .unwrap();
    let Reply::Entries(entries) = reply else {
        panic!("expected entries, got {:?}", reply);
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].payload, "wake");

    daemon.stop().await;
}
