// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Backends for the coordination layer
//!
//! The coordination primitives never touch storage directly. They call an
//! [`AtomicStore`], whose individual operations are each atomic, and an
//! [`AtomicExecute`] capability for the few sequences that must run as one
//! indivisible unit.

mod backend;
mod error;
pub mod memory;
pub mod traced;

pub use backend::{AtomicExecute, AtomicStore, Backend, GroupRead, Script, ScriptReply};
pub use error::StoreError;
pub use memory::{MemoryStats, MemoryStore};
pub use traced::TracedStore;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeStore, StoreCall};
