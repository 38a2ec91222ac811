// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Owner-token generation
//!
//! A lock's owner token must be unique to the acquiring process and
//! attempt. `TokenGen` is the seam; tests plug in predictable generators.

/// Generates owner tokens
pub trait TokenGen: Clone + Send + Sync {
    fn next_token(&self) -> String;
}

/// Random (UUID v4) tokens
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomTokens;

impl TokenGen for RandomTokens {
    fn next_token(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
