// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task queue commands

use std::time::Duration;

use clap::{Args, Subcommand};
use herd_core::{Command, EntryId, RetryRequest};

#[derive(Args)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Append a task to a stream
    Publish {
        stream: String,
        payload: String,
        #[arg(long, default_value_t = 0)]
        retry_count: u32,
    },
    /// Receive new tasks as a member of a consumer group
    Consume {
        group: String,
        consumer: String,
        stream: String,
        #[arg(long, default_value_t = 1)]
        count: usize,
        /// Wait up to this long for a task when none are ready
        #[arg(long, default_value_t = 0)]
        block_ms: u64,
    },
    /// Acknowledge a delivered task
    Ack {
        stream: String,
        group: String,
        id: EntryId,
    },
    /// Acknowledge a failed task and republish it, or dead-letter it
    Retry {
        stream: String,
        id: EntryId,
        payload: String,
        retry_count: u32,
        retry_stream: String,
        dead_letter_stream: String,
        #[arg(long, default_value_t = 3)]
        max_retries: u32,
    },
    /// List delivered but unacknowledged tasks
    Pending { stream: String, group: String },
    /// Take over tasks another consumer left idle
    Claim {
        stream: String,
        group: String,
        consumer: String,
        min_idle_ms: u64,
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
}

impl From<TaskCommand> for Command {
    fn from(command: TaskCommand) -> Self {
        match command {
            TaskCommand::Publish {
                stream,
                payload,
                retry_count,
            } => Command::TaskPublish {
                stream,
                payload,
                retry_count,
            },
            TaskCommand::Consume {
                group,
                consumer,
                stream,
                count,
                block_ms,
            } => Command::TaskConsume {
                group,
                consumer,
                stream,
                count,
                block: Duration::from_millis(block_ms),
            },
            TaskCommand::Ack { stream, group, id } => Command::TaskAck { stream, group, id },
            TaskCommand::Retry {
                stream,
                id,
                payload,
                retry_count,
                retry_stream,
                dead_letter_stream,
                max_retries,
            } => Command::TaskRetry(RetryRequest {
                stream,
                id,
                payload,
                retry_count,
                retry_stream,
                dead_letter_stream,
                max_retries,
            }),
            TaskCommand::Pending { stream, group } => Command::TaskPending { stream, group },
            TaskCommand::Claim {
                stream,
                group,
                consumer,
                min_idle_ms,
                count,
            } => Command::TaskClaim {
                stream,
                group,
                consumer,
                min_idle: Duration::from_millis(min_idle_ms),
                count,
            },
        }
    }
}
