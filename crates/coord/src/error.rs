// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use herd_core::ValidationError;
use herd_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by the coordination primitives
///
/// A denied acquire, a foreign-token release or an empty read are not
/// errors. They come back as ordinary `false`/`None` values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    BackendUnavailable(#[source] StoreError),
    /// The backend answered but refused the request, e.g. a key of the
    /// wrong type. Retrying the same call will fail the same way.
    #[error("{0}")]
    Rejected(#[source] StoreError),
}

impl From<StoreError> for CoordError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(_) | StoreError::Timeout(_) => CoordError::BackendUnavailable(e),
            StoreError::WrongType(_) | StoreError::Script { .. } => CoordError::Rejected(e),
        }
    }
}

/// Error classes carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    BackendUnavailable,
    WrongType,
    RateLimited,
    Protocol,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::BackendUnavailable => "backend_unavailable",
            ErrorKind::WrongType => "wrong_type",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Protocol => "protocol",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl CoordError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoordError::Validation(_) => ErrorKind::Validation,
            CoordError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            CoordError::Rejected(StoreError::WrongType(_)) => ErrorKind::WrongType,
            CoordError::Rejected(_) => ErrorKind::Internal,
        }
    }
}

pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

pub(crate) fn require_positive(
    field: &'static str,
    value: std::time::Duration,
) -> Result<(), ValidationError> {
    if value.is_zero() {
        return Err(ValidationError::NotPositive { field });
    }
    Ok(())
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
