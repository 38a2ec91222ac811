// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! herd daemon library: protocol, dispatch, server and lifecycle
//!
//! The `herdd` binary is a thin shell over this crate; the CLI links it for
//! the protocol types.

pub mod dispatch;
pub mod lifecycle;
pub mod protocol;
pub mod server;

pub use dispatch::{Coordinator, Limiters};
pub use lifecycle::{startup, Config, DaemonState, LifecycleError};
pub use protocol::{
    ErrorKind, ProtocolError, Reply, Request, Response, StatusReport, PROTOCOL_VERSION,
};
pub use server::{serve, ServerContext, ServerError};
