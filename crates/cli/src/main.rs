// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! herd - coordination primitives client

mod client;
mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{cache, daemon, lock, rate, task};
use herd_core::Command;
use herd_daemon::lifecycle::Config;

use crate::client::{ClientError, DaemonClient};
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "herd",
    version,
    about = "Herd - locks, cache build guards, task queues and rate limits"
)]
struct Cli {
    /// Configuration file shared with herdd
    #[arg(long, global = true, env = "HERD_CONFIG")]
    config: Option<PathBuf>,

    /// Rate-limit identity for this invocation (default: one per connection)
    #[arg(long, global = true, env = "HERD_IDENTITY")]
    identity: Option<String>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Distributed locks
    Lock(lock::LockArgs),
    /// Cache stampede guard
    Cache(cache::CacheArgs),
    /// Task queues
    Task(task::TaskArgs),
    /// Rate limiter
    Rate(rate::RateArgs),
    /// Send a raw command, e.g. `herd raw LOCK.HOLDER deploy`
    Raw {
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let command = match cli.command {
        Commands::Daemon(args) => {
            return daemon::daemon(args, &config, cli.config.as_deref(), cli.format).await;
        }
        Commands::Lock(args) => match args.command.to_command() {
            Some(command) => command,
            None => {
                println!("{}", lock::new_token());
                return Ok(());
            }
        },
        Commands::Cache(args) => args.command.into(),
        Commands::Task(args) => args.command.into(),
        Commands::Rate(args) => args.command.into(),
        // Validate locally so typos never reach the daemon
        Commands::Raw { args } => Command::parse(&args)?,
    };

    let client = match DaemonClient::connect(&config.socket_path) {
        Ok(client) => client.with_identity(cli.identity),
        Err(ClientError::DaemonNotRunning) => {
            anyhow::bail!("Daemon not running (start it with `herd daemon start`)")
        }
        Err(e) => return Err(e.into()),
    };

    let reply = client.execute(&command).await?;
    output::print_reply(&reply, cli.format);
    Ok(())
}

/// Diagnostics go to stderr so stdout stays parseable
fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_env("HERD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
