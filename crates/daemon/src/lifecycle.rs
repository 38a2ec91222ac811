// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fs2::FileExt;
use herd_coord::Sweeper;
use herd_core::{ConfigError, HerdConfig, SystemClock};
use herd_store::{MemoryStore, TracedStore};
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dispatch::{Coordinator, Limiters};
use crate::server::ServerContext;

/// Backend used by the daemon (wrapped with tracing)
pub type DaemonStore = TracedStore<MemoryStore>;

pub type DaemonContext = ServerContext<DaemonStore, SystemClock>;

/// Daemon configuration with every path resolved
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub pid_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    pub settings: HerdConfig,
}

impl Config {
    /// Load settings from `path` (defaults when `None`) and resolve paths
    pub fn load(path: Option<&Path>) -> Result<Self, LifecycleError> {
        let settings = HerdConfig::load_or_default(path)?;
        Self::from_settings(settings)
    }

    pub fn from_settings(settings: HerdConfig) -> Result<Self, LifecycleError> {
        settings.validate()?;
        Ok(Self {
            socket_path: settings.daemon.socket_path(),
            pid_path: settings.daemon.pid_path()?,
            log_path: settings.daemon.log_path()?,
            settings,
        })
    }
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub listener: UnixListener,
    pub context: Arc<DaemonContext>,
    sweeper: JoinHandle<()>,
}

impl DaemonState {
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.context.shutdown
    }

    /// Shutdown the daemon gracefully
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // 1. Wake blocked consumers and stop the sweeper
        self.context.shutdown.cancel();
        if let Err(e) = self.sweeper.await {
            warn!("Sweeper task failed: {}", e);
        }

        // 2. Forget rate-limit state
        self.context.coordinator.limiters().clear();

        // 3. Remove socket file
        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        // 4. Remove PID file
        if self.config.pid_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.pid_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        // 5. Lock file is released when self.lock_file is dropped

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<DaemonState, LifecycleError> {
    match startup_inner(config).await {
        Ok(state) => Ok(state),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(config, &e);
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config) -> Result<DaemonState, LifecycleError> {
    // 1. Create directories
    for path in [&config.pid_path, &config.socket_path, &config.log_path] {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // 2. Acquire lock file FIRST - prevents races
    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&config.pid_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file
    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Build the coordination layer
    let settings = &config.settings;
    let store = TracedStore::new(MemoryStore::new()).with_call_timeout(settings.daemon.backend_timeout);
    let limiters = Limiters::with_clock(&settings.rate_limit, SystemClock);
    let shutdown = CancellationToken::new();
    let coordinator = Coordinator::new(
        store.clone(),
        SystemClock,
        limiters.clone(),
        settings.queue.clone(),
        shutdown.clone(),
    );
    let context = Arc::new(ServerContext::new(
        coordinator,
        shutdown.clone(),
        settings.daemon.request_timeout,
    ));

    // 4. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    // 5. Start housekeeping
    let sweeper = Sweeper::new(store, limiters.iter().cloned().collect(), &settings.maintenance);
    let sweeper = tokio::spawn(sweeper.run(shutdown));

    info!(
        rate_limit_enabled = settings.rate_limit.enabled,
        window_secs = settings.rate_limit.window.as_secs(),
        max_requests = settings.rate_limit.max_requests,
        "Daemon started"
    );

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        listener,
        context,
        sweeper,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config, error: &LifecycleError) {
    // Another daemon owns these files
    if matches!(error, LifecycleError::LockFailed(_)) {
        return;
    }

    // Remove socket if we created it
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }

    // Remove PID/lock file
    if config.pid_path.exists() {
        let _ = std::fs::remove_file(&config.pid_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
