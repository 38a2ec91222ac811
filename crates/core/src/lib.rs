// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! herd-core: shared vocabulary for the herd coordination layer
//!
//! This crate provides:
//! - Clock and owner-token abstractions (real and fake)
//! - Stream entry identifiers and decoded task entries
//! - The command surface with argument validation
//! - TOML configuration

pub mod clock;
pub mod command;
pub mod config;
pub mod entry;
pub mod error;
pub mod token;

pub use clock::{Clock, FakeClock, SystemClock};
pub use command::{Command, RetryRequest};
pub use config::{
    ConfigError, DaemonConfig, HerdConfig, MaintenanceConfig, QueueConfig, RateLimitConfig,
    SaturationPolicy,
};
pub use entry::{EntryId, Fields, PendingEntry, StreamRecord, TaskEntry};
pub use error::ValidationError;
pub use token::{RandomTokens, TokenGen};
