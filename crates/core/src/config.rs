// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration loaded from `herd.toml`
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("invalid config {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("could not determine state directory")]
    NoStateDir,
}

/// Top-level configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HerdConfig {
    pub daemon: DaemonConfig,
    pub rate_limit: RateLimitConfig,
    pub queue: QueueConfig,
    pub maintenance: MaintenanceConfig,
}

impl HerdConfig {
    /// Load from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let config: HerdConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, otherwise defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.backend_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "daemon.backend_timeout must be greater than zero".to_string(),
            ));
        }
        if self.rate_limit.window.is_zero() {
            return Err(ConfigError::Invalid(
                "rate_limit.window must be greater than zero".to_string(),
            ));
        }
        if self.rate_limit.capacity == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.capacity must be greater than zero".to_string(),
            ));
        }
        if self.queue.max_count == 0 {
            return Err(ConfigError::Invalid(
                "queue.max_count must be greater than zero".to_string(),
            ));
        }
        if self.maintenance.interval.is_zero() {
            return Err(ConfigError::Invalid(
                "maintenance.interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Daemon process settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    /// Unix socket the daemon listens on (default: `$HERD_SOCKET_DIR/herd.sock`)
    pub socket_path: Option<PathBuf>,
    /// Log file (default: `<state dir>/herdd.log`)
    pub log_path: Option<PathBuf>,
    /// Pid/lock file (default: `<state dir>/herdd.pid`)
    pub pid_path: Option<PathBuf>,
    /// Per-message read/write timeout on client connections
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Deadline for a single backend call (blocking reads add their block time)
    #[serde(with = "humantime_serde")]
    pub backend_timeout: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            log_path: None,
            pid_path: None,
            request_timeout: Duration::from_secs(5),
            backend_timeout: Duration::from_secs(2),
        }
    }
}

impl DaemonConfig {
    pub fn socket_path(&self) -> PathBuf {
        self.socket_path
            .clone()
            .unwrap_or_else(|| socket_dir().join("herd.sock"))
    }

    pub fn log_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.log_path {
            Some(path) => Ok(path.clone()),
            None => Ok(state_dir()?.join("herdd.log")),
        }
    }

    pub fn pid_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.pid_path {
            Some(path) => Ok(path.clone()),
            None => Ok(state_dir()?.join("herdd.pid")),
        }
    }
}

/// What the rate limiter does when its table is full and a new identity arrives
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaturationPolicy {
    /// Evict the identity checked least recently and track the newcomer
    EvictLeastRecent,
    /// Allow the newcomer's request without tracking it
    #[default]
    FailOpen,
}

/// Fixed-window rate limiting
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    pub enabled: bool,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    pub max_requests: u64,
    /// Maximum number of identities tracked at once
    pub capacity: usize,
    pub on_full: SaturationPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: Duration::from_secs(60),
            max_requests: 100,
            capacity: 2048,
            on_full: SaturationPolicy::default(),
        }
    }
}

/// Task queue limits
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    /// Upper bound on entries returned by one consume or claim
    pub max_count: usize,
    /// Upper bound on how long one consume may block
    #[serde(with = "humantime_serde")]
    pub max_block: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_count: 1000,
            max_block: Duration::from_secs(30),
        }
    }
}

/// Background sweeper settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaintenanceConfig {
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

/// State directory for herd
///
/// `HERD_STATE_DIR`, then `$XDG_STATE_HOME/herd`, then `~/.local/state/herd`.
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("HERD_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("herd"));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoStateDir)?;
    Ok(home.join(".local/state/herd"))
}

/// Socket directory for herd
///
/// Uses /tmp/herd by default to keep paths short (macOS SUN_LEN = 104).
/// Can be overridden with HERD_SOCKET_DIR.
pub fn socket_dir() -> PathBuf {
    match std::env::var("HERD_SOCKET_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => PathBuf::from("/tmp/herd"),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
