// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! herd-coord: coordination primitives over an atomic backend
//!
//! - [`LockManager`]: mutual exclusion with owner tokens
//! - [`CacheStampedeGuard`]: one builder per cache key, everyone else waits
//! - [`TaskQueue`]: competing consumers with ack, retry and dead-lettering
//! - [`RateLimiter`]: per-identity fixed-window admission
//!
//! None of them keep state of their own except the rate limiter; everything
//! else lives in the backend and is reached through single atomic calls.

pub mod error;
pub mod lock;
pub mod maintenance;
pub mod queue;
pub mod rate_limit;
pub mod stampede;

pub use error::{CoordError, ErrorKind};
pub use lock::{lock_key, LockManager, LOCK_PREFIX};
pub use maintenance::{SweepStats, Sweeper};
pub use queue::{RetryOutcome, TaskQueue};
pub use rate_limit::{RateLimiter, WindowUsage};
pub use stampede::{BuildDecision, CacheStampedeGuard};
