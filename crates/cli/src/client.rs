// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::{Path, PathBuf};
use std::process::Command as Process;
use std::time::{Duration, Instant};

use herd_core::Command;
use herd_daemon::lifecycle::{Config, LifecycleError};
use herd_daemon::protocol::{self, ErrorKind, ProtocolError};
use herd_daemon::{Reply, Request, Response, StatusReport, PROTOCOL_VERSION};
use thiserror::Error;
use tokio::net::UnixStream;
use tracing::debug;

/// Duration from a millisecond env var, or `default`
fn env_ms(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

/// Timeout for one request/response exchange
pub fn timeout_ipc() -> Duration {
    env_ms("HERD_TIMEOUT_IPC_MS", Duration::from_secs(5))
}

/// How long `daemon start` waits for the socket to appear
pub fn timeout_connect() -> Duration {
    env_ms("HERD_TIMEOUT_CONNECT_MS", Duration::from_secs(5))
}

/// How long `daemon stop` waits for the process to exit
pub fn timeout_exit() -> Duration {
    env_ms("HERD_TIMEOUT_EXIT_MS", Duration::from_secs(2))
}

pub fn poll_interval() -> Duration {
    env_ms("HERD_POLL_INTERVAL_MS", Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{kind}: {message}")]
    Rejected { kind: ErrorKind, message: String },

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("Configuration error: {0}")]
    Config(#[from] LifecycleError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon client
///
/// Each request opens its own connection, so without an explicit identity
/// every request is rate limited under a fresh connection id.
pub struct DaemonClient {
    socket_path: PathBuf,
    identity: Option<String>,
}

impl DaemonClient {
    /// Connect to an existing daemon (no auto-start)
    pub fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }

        Ok(Self {
            socket_path: socket_path.to_path_buf(),
            identity: None,
        })
    }

    /// Rate-limit identity attached to every command
    pub fn with_identity(mut self, identity: Option<String>) -> Self {
        self.identity = identity;
        self
    }

    /// Start `herdd` in the background and wait until it accepts connections
    pub fn start(config: &Config, config_file: Option<&Path>) -> Result<Self, ClientError> {
        let child = start_daemon_background(config_file)?;
        Self::connect_with_retry(config, timeout_connect(), child)
    }

    fn connect_with_retry(
        config: &Config,
        timeout: Duration,
        mut child: std::process::Child,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            // Check if daemon process exited early (startup failure)
            if let Ok(Some(status)) = child.try_wait() {
                // Poll for startup error in log (filesystem may need to sync)
                let poll_start = Instant::now();
                while poll_start.elapsed() < timeout_exit() {
                    if let Some(err) = read_startup_error(&config.log_path) {
                        return Err(ClientError::DaemonStartFailed(err));
                    }
                    std::thread::sleep(poll_interval());
                }
                return Err(ClientError::DaemonStartFailed(format!(
                    "exited with {}",
                    status
                )));
            }

            match Self::connect(&config.socket_path) {
                Ok(client) => return Ok(client),
                Err(ClientError::DaemonNotRunning) => std::thread::sleep(poll_interval()),
                Err(e) => return Err(wrap_with_startup_error(e, &config.log_path)),
            }
        }

        Err(wrap_with_startup_error(
            ClientError::DaemonStartTimeout,
            &config.log_path,
        ))
    }

    /// Send a request and receive a response with specific timeouts
    async fn send_with_timeout(
        &self,
        request: Request,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        let data = protocol::encode(&request)?;
        tokio::time::timeout(write_timeout, protocol::write_message(&mut writer, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let response_bytes =
            tokio::time::timeout(read_timeout, protocol::read_message(&mut reader))
                .await
                .map_err(|_| ProtocolError::Timeout)??;

        let response: Response = protocol::decode(&response_bytes)?;
        Ok(response)
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: Request) -> Result<Response, ClientError> {
        self.send_with_timeout(request, timeout_ipc(), timeout_ipc())
            .await
    }

    /// Run a coordination command
    ///
    /// A blocking consume extends the read timeout by its block duration.
    pub async fn execute(&self, command: &Command) -> Result<Reply, ClientError> {
        let wait = match command {
            Command::TaskConsume { block, .. } => *block,
            _ => Duration::ZERO,
        };
        let args = command.to_args();
        debug!(?args, "sending command");

        let request = Request::Command {
            identity: self.identity.clone(),
            args,
        };
        match self
            .send_with_timeout(request, timeout_ipc() + wait, timeout_ipc())
            .await?
        {
            Response::Reply { reply } => Ok(reply),
            Response::Error { kind, message } => Err(ClientError::Rejected { kind, message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Get daemon status
    pub async fn status(&self) -> Result<StatusReport, ClientError> {
        match self.send(Request::Status).await? {
            Response::Status(report) => Ok(report),
            Response::Error { kind, message } => Err(ClientError::Rejected { kind, message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(Request::Shutdown).await? {
            Response::ShuttingDown => Ok(()),
            Response::Error { kind, message } => Err(ClientError::Rejected { kind, message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Round-trip latency of a ping
    pub async fn ping(&self) -> Result<Duration, ClientError> {
        let start = Instant::now();
        match self.send(Request::Ping).await? {
            Response::Pong => Ok(start.elapsed()),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Get daemon protocol version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        match self
            .send(Request::Hello {
                version: PROTOCOL_VERSION.to_string(),
            })
            .await?
        {
            Response::Hello { version } => Ok(version),
            Response::Error { kind, message } => Err(ClientError::Rejected { kind, message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

/// Start the daemon in the background, returning the child process handle
fn start_daemon_background(config_file: Option<&Path>) -> Result<std::process::Child, ClientError> {
    let herdd = find_herdd_binary();

    let mut command = Process::new(&herdd);
    if let Some(path) = config_file {
        command.arg(path);
    }
    command
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(format!("{}: {}", herdd.display(), e)))
}

/// Stop the daemon (graceful first, then forceful)
/// Returns true if daemon was stopped, false if it wasn't running
pub async fn daemon_stop(config: &Config) -> Result<bool, ClientError> {
    let client = match DaemonClient::connect(&config.socket_path) {
        Ok(c) => c,
        Err(ClientError::DaemonNotRunning) => return Ok(false),
        Err(e) => return Err(e),
    };

    let shutdown_result = client.shutdown().await;

    if let Some(pid) = read_daemon_pid(&config.pid_path) {
        if shutdown_result.is_ok() {
            wait_for_exit(pid, timeout_exit()).await;
        }

        // Force kill if still running
        if process_exists(pid) {
            force_kill_daemon(pid);
            wait_for_exit(pid, timeout_exit()).await;
        }
    } else {
        shutdown_result?;
    }

    Ok(true)
}

/// Wait for a process to exit
async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !process_exists(pid) {
            return true;
        }
        tokio::time::sleep(poll_interval()).await;
    }
    false
}

/// Find the herdd binary
fn find_herdd_binary() -> PathBuf {
    // Explicit override (used by tests to ensure correct binary)
    if let Ok(path) = std::env::var("HERD_DAEMON_BINARY") {
        return PathBuf::from(path);
    }

    // Check current executable's directory
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("herdd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    // Fall back to PATH lookup
    PathBuf::from("herdd")
}

/// Get the PID from the daemon PID file, if it exists
pub fn read_daemon_pid(pid_path: &Path) -> Option<u32> {
    std::fs::read_to_string(pid_path)
        .ok()
        .and_then(|content| content.trim().parse::<u32>().ok())
}

/// Send `signal` to `pid` with kill(1); true if it was delivered
fn send_signal(pid: u32, signal: &str) -> bool {
    Process::new("kill")
        .arg(signal)
        .arg(pid.to_string())
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

/// Signal 0 probes for existence without disturbing the process
pub fn process_exists(pid: u32) -> bool {
    send_signal(pid, "-0")
}

pub fn force_kill_daemon(pid: u32) -> bool {
    send_signal(pid, "-9")
}

/// Startup marker prefix that herdd writes to its log before anything else.
/// Full format: "--- herdd: starting (pid: 12345) ---"
const STARTUP_MARKER_PREFIX: &str = "--- herdd: starting (pid: ";

/// Read the daemon log from the last startup marker, looking for errors.
pub fn read_startup_error(log_path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(log_path).ok()?;

    let start_pos = content.rfind(STARTUP_MARKER_PREFIX)?;
    let startup_log = &content[start_pos..];

    let errors: Vec<&str> = startup_log
        .lines()
        .filter(|line| line.contains(" ERROR ") || line.contains("Failed to start"))
        .collect();

    if errors.is_empty() {
        return None;
    }

    // Format: "timestamp LEVEL target: message"
    let error_messages: Vec<String> = errors
        .iter()
        .filter_map(|line| line.split_once(": ").map(|(_, msg)| msg.to_string()))
        .collect();

    if error_messages.is_empty() {
        Some(errors.join("\n"))
    } else {
        Some(error_messages.join("\n"))
    }
}

/// Prefer the daemon's own startup error over a generic connection failure
fn wrap_with_startup_error(err: ClientError, log_path: &Path) -> ClientError {
    if matches!(err, ClientError::DaemonStartFailed(_)) {
        return err;
    }

    match read_startup_error(log_path) {
        Some(startup_error) => ClientError::DaemonStartFailed(startup_error),
        None => err,
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
