// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;
use thiserror::Error;

/// Errors from backend calls
///
/// `Unavailable` and `Timeout` mean the backend could not give an answer.
/// `WrongType` and `Script` are answers: the request itself was refused.
/// None of them is ever a stand-in for "denied" or "absent".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend call timed out after {0:?}")]
    Timeout(Duration),
    #[error("key '{0}' holds a value of the wrong type")]
    WrongType(String),
    #[error("script {script} failed: {message}")]
    Script {
        script: &'static str,
        message: String,
    },
}
