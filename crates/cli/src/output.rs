// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output formatting for CLI commands

use clap::ValueEnum;
use herd_daemon::Reply;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print a reply in the specified format
pub fn print_reply(reply: &Reply, format: OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", render(reply)),
        OutputFormat::Json => print_json(reply),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

/// Human-readable rendering of a reply
pub fn render(reply: &Reply) -> String {
    match reply {
        Reply::Ok => "OK".to_string(),
        Reply::Bool(b) => b.to_string(),
        Reply::Int(n) => n.to_string(),
        Reply::Text(s) => s.clone(),
        Reply::Nil => "(nil)".to_string(),
        Reply::Id(id) => id.to_string(),
        Reply::Entries(entries) if entries.is_empty() => "(empty)".to_string(),
        Reply::Entries(entries) => entries
            .iter()
            .map(|e| {
                format!(
                    "{:<20} {:<16} retry={:<2} {}",
                    e.id.to_string(),
                    e.stream,
                    e.retry_count,
                    e.payload
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Reply::Pending(pending) if pending.is_empty() => "(empty)".to_string(),
        Reply::Pending(pending) => pending
            .iter()
            .map(|p| {
                format!(
                    "{:<20} {:<16} idle={}ms deliveries={}",
                    p.id.to_string(),
                    p.consumer,
                    p.idle_ms,
                    p.delivery_count
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
