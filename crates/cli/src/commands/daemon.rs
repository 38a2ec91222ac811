// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon management commands

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use herd_daemon::lifecycle::Config;

use crate::client::{daemon_stop, ClientError, DaemonClient};
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start herdd in the background
    Start,
    /// Stop the running daemon
    Stop,
    /// Show daemon status
    Status,
    /// Check that the daemon answers
    Ping,
}

pub async fn daemon(
    args: DaemonArgs,
    config: &Config,
    config_file: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    match args.command {
        DaemonCommand::Start => start(config, config_file).await,
        DaemonCommand::Stop => stop(config).await,
        DaemonCommand::Status => status(config, format).await,
        DaemonCommand::Ping => ping(config).await,
    }
}

async fn start(config: &Config, config_file: Option<&Path>) -> Result<()> {
    if let Ok(client) = DaemonClient::connect(&config.socket_path) {
        if client.ping().await.is_ok() {
            println!("Daemon already running");
            return Ok(());
        }
    }

    let config = config.clone();
    let config_file = config_file.map(Path::to_path_buf);
    // Startup polling sleeps between attempts
    tokio::task::spawn_blocking(move || DaemonClient::start(&config, config_file.as_deref()))
        .await??;

    println!("Daemon started");
    Ok(())
}

async fn stop(config: &Config) -> Result<()> {
    if daemon_stop(config).await? {
        println!("Daemon stopped");
    } else {
        println!("Daemon not running");
    }
    Ok(())
}

async fn status(config: &Config, format: OutputFormat) -> Result<()> {
    let client = match DaemonClient::connect(&config.socket_path) {
        Ok(client) => client,
        Err(ClientError::DaemonNotRunning) => {
            println!("Daemon not running");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let status = match client.status().await {
        Ok(status) => status,
        Err(ClientError::Io(_)) => {
            println!("Daemon not running (stale socket)");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Json => print_json(&status),
        OutputFormat::Text => {
            println!("Status: running");
            println!("Version: {}", status.version);
            if let Ok(protocol) = client.hello().await {
                println!("Protocol: {}", protocol);
            }
            println!("Uptime: {}", format_uptime(status.uptime_secs));
            println!("Connections: {}", status.connections);
            println!(
                "Rate limiting: {}",
                if status.rate_limit_enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            println!("Tracked identities: {}", status.tracked_identities);
            println!("Socket: {}", config.socket_path.display());
        }
    }
    Ok(())
}

async fn ping(config: &Config) -> Result<()> {
    let client = DaemonClient::connect(&config.socket_path)?;
    let elapsed = client.ping().await?;
    println!("PONG ({}ms)", elapsed.as_millis());
    Ok(())
}

fn format_uptime(secs: u64) -> String {
    match secs {
        s if s < 60 => format!("{}s", s),
        s if s < 3600 => format!("{}m {}s", s / 60, s % 60),
        s => format!("{}h {}m", s / 3600, (s % 3600) / 60),
    }
}
