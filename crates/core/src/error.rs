// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation errors raised before any backend call is made

use thiserror::Error;

/// Malformed or missing arguments
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("empty command")]
    EmptyCommand,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("wrong number of arguments for '{command}'")]
    WrongArity { command: &'static str },
    #[error("invalid {field}: '{value}' is not an integer")]
    InvalidInteger { field: &'static str, value: String },
    #[error("invalid {field}: must be greater than zero")]
    NotPositive { field: &'static str },
    #[error("invalid {field}: must not be negative")]
    Negative { field: &'static str },
    #[error("invalid {field}: must not be empty")]
    Empty { field: &'static str },
    #[error("invalid entry id '{0}'")]
    InvalidEntryId(String),
}
