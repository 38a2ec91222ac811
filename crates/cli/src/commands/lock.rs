// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock commands

use std::time::Duration;

use clap::{Args, Subcommand};
use herd_core::{Command, RandomTokens, TokenGen};

#[derive(Args)]
pub struct LockArgs {
    #[command(subcommand)]
    pub command: LockCommand,
}

#[derive(Subcommand)]
pub enum LockCommand {
    /// Take a lock if nobody holds it
    Acquire {
        name: String,
        /// Owner token; generate one with `herd lock token`
        token: String,
        ttl_ms: u64,
    },
    /// Release a lock held with the given token
    Release { name: String, token: String },
    /// Push back the expiry of a lock held with the given token
    Extend {
        name: String,
        token: String,
        ttl_ms: u64,
    },
    /// Show the token currently holding a lock
    Holder { name: String },
    /// Print a fresh owner token (no daemon needed)
    Token,
}

impl LockCommand {
    /// The daemon command to send, or `None` for local-only subcommands
    pub fn to_command(&self) -> Option<Command> {
        let command = match self {
            LockCommand::Acquire {
                name,
                token,
                ttl_ms,
            } => Command::LockAcquire {
                name: name.clone(),
                token: token.clone(),
                ttl: Duration::from_millis(*ttl_ms),
            },
            LockCommand::Release { name, token } => Command::LockRelease {
                name: name.clone(),
                token: token.clone(),
            },
            LockCommand::Extend {
                name,
                token,
                ttl_ms,
            } => Command::LockExtend {
                name: name.clone(),
                token: token.clone(),
                ttl: Duration::from_millis(*ttl_ms),
            },
            LockCommand::Holder { name } => Command::LockHolder { name: name.clone() },
            LockCommand::Token => return None,
        };
        Some(command)
    }
}

pub fn new_token() -> String {
    RandomTokens.next_token()
}
