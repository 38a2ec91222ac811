// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Herd Daemon (herdd)
//!
//! Serves the coordination commands over a Unix socket.
//!
//! Usage: `herdd [CONFIG]`, where CONFIG is an optional TOML file.

use std::path::PathBuf;
use std::sync::Arc;

use herd_daemon::lifecycle::{self, Config, LifecycleError};
use herd_daemon::server;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    // Marker goes in before tracing so the CLI can find this attempt
    write_startup_marker(&config)?;
    let log_guard = setup_logging(&config)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting herdd");

    let daemon = match lifecycle::startup(&config).await {
        Ok(daemon) => daemon,
        Err(e) => {
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(socket = %config.socket_path.display(), "Daemon ready");
    println!("READY");

    let reason = tokio::select! {
        // Returns once a client sends Shutdown
        _ = server::serve(&daemon.listener, Arc::clone(&daemon.context)) => "shutdown request",
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    info!(reason, "Stopping daemon");

    daemon.shutdown().await?;

    info!("Daemon stopped");
    Ok(())
}

/// First line herdd appends to its log on every start.
/// `herd daemon start` reads errors from the last marker onwards.
/// Full format: "--- herdd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- herdd: starting (pid: ";

/// Append a line to the log file directly, bypassing tracing
fn append_to_log(config: &Config, line: &str) -> std::io::Result<()> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}", line)
}

fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    let marker = format!("{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id());
    append_to_log(config, &marker)?;
    Ok(())
}

/// The non-blocking writer may not flush before the process exits
fn write_startup_error(config: &Config, error: &LifecycleError) {
    let _ = append_to_log(config, &format!("ERROR Failed to start daemon: {}", error));
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let (Some(dir), Some(file_name)) = (config.log_path.parent(), config.log_path.file_name())
    else {
        return Err(LifecycleError::NoStateDir);
    };
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(
        dir, file_name,
    ));

    let filter = EnvFilter::try_from_env("HERD_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();

    Ok(guard)
}
