//! Shared fixtures for the workspace specs.

#![allow(dead_code)]

pub use herd_coord::{
    BuildDecision, CacheStampedeGuard, ErrorKind, LockManager, RateLimiter, RetryOutcome,
    TaskQueue,
};
pub use herd_core::{
    EntryId, FakeClock, HerdConfig, RateLimitConfig, RetryRequest, SaturationPolicy,
};
pub use herd_daemon::{Reply, Request, Response};
pub use herd_store::{FakeStore, MemoryStore};
pub use similar_asserts::assert_eq;
pub use std::sync::Arc;
pub use std::time::Duration;
pub use tokio_util::sync::CancellationToken;

use herd_core::DaemonConfig;
use herd_daemon::lifecycle::{self, Config};
use herd_daemon::protocol;
use herd_daemon::server;
use tokio::net::UnixStream;

/// Every primitive over one fake backend sharing one fake clock
pub struct World {
    pub store: FakeStore,
    pub clock: FakeClock,
    pub locks: LockManager<FakeStore>,
    pub cache: CacheStampedeGuard<FakeStore>,
    pub queue: TaskQueue<FakeStore, FakeClock>,
}

impl World {
    pub fn new() -> Self {
        let store = FakeStore::new();
        let clock = store.clock().clone();
        Self {
            locks: LockManager::new(store.clone()),
            cache: CacheStampedeGuard::new(store.clone()),
            queue: TaskQueue::with_clock(store.clone(), clock.clone()),
            store,
            clock,
        }
    }
}

pub fn limiter(window: Duration, max_requests: u64, clock: &FakeClock) -> RateLimiter<FakeClock> {
    RateLimiter::with_clock(
        &RateLimitConfig {
            window,
            max_requests,
            ..RateLimitConfig::default()
        },
        clock.clone(),
    )
}

/// A daemon started with its real lifecycle in a temp dir
pub struct Daemon {
    pub dir: tempfile::TempDir,
    pub config: Config,
    server: tokio::task::JoinHandle<()>,
}

impl Daemon {
    pub async fn start() -> Self {
        Self::start_with(HerdConfig::default()).await
    }

    pub async fn start_with(mut settings: HerdConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        settings.daemon = DaemonConfig {
            socket_path: Some(dir.path().join("herd.sock")),
            log_path: Some(dir.path().join("herdd.log")),
            pid_path: Some(dir.path().join("herdd.pid")),
            ..settings.daemon
        };
        let config = Config::from_settings(settings).unwrap();
        let daemon = Arc::new(lifecycle::startup(&config).await.unwrap());
        let ctx = Arc::clone(&daemon.context);
        let server = tokio::spawn(async move { server::serve(&daemon.listener, ctx).await });
        Self {
            dir,
            config,
            server,
        }
    }

    pub async fn connect(&self) -> Conn {
        Conn {
            stream: UnixStream::connect(&self.config.socket_path).await.unwrap(),
        }
    }

    /// Ask the daemon to shut down and wait for the server loop to exit
    pub async fn stop(self) {
        let mut conn = self.connect().await;
        assert_eq!(conn.send(Request::Shutdown).await, Response::ShuttingDown);
        tokio::time::timeout(Duration::from_secs(5), self.server)
            .await
            .expect("server should stop")
            .unwrap();
    }
}

/// One client connection speaking the length-prefixed protocol
pub struct Conn {
    stream: UnixStream,
}

impl Conn {
    pub async fn send(&mut self, request: Request) -> Response {
        let data = protocol::encode(&request).unwrap();
        protocol::write_message(&mut self.stream, &data).await.unwrap();
        let bytes = protocol::read_message(&mut self.stream).await.unwrap();
        protocol::decode(&bytes).unwrap()
    }

    pub async fn cmd(&mut self, args: &[&str]) -> Response {
        self.cmd_as(None, args).await
    }

    /// Send a command under an explicit rate-limit identity
    pub async fn cmd_as(&mut self, identity: Option<&str>, args: &[&str]) -> Response {
        self.send(Request::Command {
            identity: identity.map(str::to_string),
            args: args.iter().map(|s| s.to_string()).collect(),
        })
        .await
    }

    /// Run a command that must succeed and return its reply
    pub async fn ok(&mut self, args: &[&str]) -> Reply {
        match self.cmd(args).await {
            Response::Reply { reply } => reply,
            other => panic!("{:?} failed: {:?}", args, other),
        }
    }

    pub async fn error_kind(&mut self, args: &[&str]) -> ErrorKind {
        match self.cmd(args).await {
            Response::Error { kind, .. } => kind,
            other => panic!("{:?} should fail, got {:?}", args, other),
        }
    }
}
