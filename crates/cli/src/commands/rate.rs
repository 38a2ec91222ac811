// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate limiter commands

use clap::{Args, Subcommand};
use herd_core::Command;

#[derive(Args)]
pub struct RateArgs {
    #[command(subcommand)]
    pub command: RateCommand,
}

#[derive(Subcommand)]
pub enum RateCommand {
    /// Count a request against an identity's window: prints true if allowed
    Check { identity: String, tag: String },
}

impl From<RateCommand> for Command {
    fn from(command: RateCommand) -> Self {
        match command {
            RateCommand::Check { identity, tag } => Command::RateCheck { identity, tag },
        }
    }
}
