// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache stampede-guard commands

use std::time::Duration;

use clap::{Args, Subcommand};
use herd_core::Command;

#[derive(Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Subcommand)]
pub enum CacheCommand {
    /// Ask to build a cache entry: prints LOAD (you build) or WAIT
    Lock {
        key: String,
        /// Build lock lifetime
        ttl_ms: u64,
        #[arg(default_value_t = 0)]
        loader_timeout_ms: u64,
    },
    /// Store a built value and release the build lock
    Set {
        key: String,
        value: String,
        ttl_ms: u64,
    },
    /// Read a cached value
    Get { key: String },
}

impl From<CacheCommand> for Command {
    fn from(command: CacheCommand) -> Self {
        match command {
            CacheCommand::Lock {
                key,
                ttl_ms,
                loader_timeout_ms,
            } => Command::CacheRequestBuild {
                key,
                ttl: Duration::from_millis(ttl_ms),
                loader_timeout: Duration::from_millis(loader_timeout_ms),
            },
            CacheCommand::Set { key, value, ttl_ms } => Command::CacheComplete {
                key,
                value,
                ttl: Duration::from_millis(ttl_ms),
            },
            CacheCommand::Get { key } => Command::CacheRead { key },
        }
    }
}
