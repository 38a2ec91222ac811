// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod cache;
pub mod daemon;
pub mod lock;
pub mod rate;
pub mod task;
