//! Daemon lifecycle specs
//!
//! Startup takes the pid lock and binds the socket; shutdown releases both.

use crate::prelude::*;
use crate::prelude::assert_eq;
use herd_daemon::lifecycle;

#[tokio::test]
async fn hello_ping_and_status() {
    let daemon = Daemon::start().await;
    let mut conn = daemon.connect().await;

    assert_eq!(conn.send(Request::Ping).await, Response::Pong);
    assert_eq!(
        conn.send(Request::Hello { version: herd_daemon::PROTOCOL_VERSION.to_string() }).await,
        Response::Hello { version: herd_daemon::PROTOCOL_VERSION.to_string() }
    );
    let Response::Status(status) = conn.send(Request::Status).await else {
        panic!("expected status");
    };
    assert_eq!(status.connections, 1);
    assert!(status.rate_limit_enabled);

    daemon.stop().await;
}

#[tokio::test]
async fn second_daemon_on_same_pid_file_is_refused() {
    let daemon = Daemon::start().await;

    let second = lifecycle::startup(&daemon.config).await;

    assert!(matches!(second, Err(lifecycle::LifecycleError::LockFailed(_))));
    assert!(daemon.config.socket_path.exists());
    daemon.stop().await;
}

#[tokio::test]
async fn shutdown_cleans_up_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = HerdConfig::default();
    settings.daemon.socket_path = Some(dir.path().join("herd.sock"));
    settings.daemon.pid_path = Some(dir.path().join("herdd.pid"));
    settings.daemon.log_path = Some(dir.path().join("herdd.log"));
    let config = lifecycle::Config::from_settings(settings).unwrap();

    let daemon = lifecycle::startup(&config).await.unwrap();
    assert!(config.socket_path.exists());
    assert!(config.pid_path.exists());

    daemon.shutdown().await.unwrap();

    assert!(!config.socket_path.exists());
    assert!(!config.pid_path.exists());
    // The lock is free again
    let again = lifecycle::startup(&config).await.unwrap();
    again.shutdown().await.unwrap();
}
