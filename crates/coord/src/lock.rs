// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed mutex with owner tokens
//!
//! A lock is a single expiring key whose value is the holder's token.
//! Acquire is set-if-absent, release is compare-and-delete and extend is
//! compare-and-extend, so no call can touch a lock held under another token.
//!
//! Locking is advisory. It relies on the TTL outlasting the critical section
//! and on bounded clock skew between backend and clients. Nothing downstream
//! checks a fencing token.

use crate::error::{require_non_empty, require_positive, CoordError};
use herd_core::{RandomTokens, TokenGen};
use herd_store::AtomicStore;
use std::time::Duration;

/// Key prefix shared by named locks and cache build locks
pub const LOCK_PREFIX: &str = "lock:";

pub fn lock_key(name: &str) -> String {
    format!("{LOCK_PREFIX}{name}")
}

#[derive(Clone)]
pub struct LockManager<S, T = RandomTokens> {
    store: S,
    tokens: T,
}

impl<S: AtomicStore> LockManager<S> {
    pub fn new(store: S) -> Self {
        Self::with_tokens(store, RandomTokens)
    }
}

impl<S: AtomicStore, T: TokenGen> LockManager<S, T> {
    pub fn with_tokens(store: S, tokens: T) -> Self {
        Self { store, tokens }
    }

    /// A fresh owner token for callers that don't bring their own
    pub fn new_token(&self) -> String {
        self.tokens.next_token()
    }

    /// Take `name` for `ttl` if nobody holds it
    pub async fn acquire(&self, name: &str, token: &str, ttl: Duration) -> Result<bool, CoordError> {
        require_non_empty("name", name)?;
        require_non_empty("token", token)?;
        require_positive("ttl", ttl)?;

        let granted = self
            .store
            .set_if_absent_with_expiry(&lock_key(name), token, ttl)
            .await?;
        tracing::debug!(name, granted, ttl_ms = ttl.as_millis() as u64, "lock acquire");
        Ok(granted)
    }

    /// Give up `name`; false if it is absent, expired or held under another token
    pub async fn release(&self, name: &str, token: &str) -> Result<bool, CoordError> {
        require_non_empty("name", name)?;
        require_non_empty("token", token)?;

        let released = self.store.compare_and_delete(&lock_key(name), token).await?;
        if !released {
            tracing::debug!(name, "release refused: not the holder");
        }
        Ok(released)
    }

    /// Push the expiry of a lock we still hold to `now + ttl`
    ///
    /// Never creates the lock.
    pub async fn extend(&self, name: &str, token: &str, ttl: Duration) -> Result<bool, CoordError> {
        require_non_empty("name", name)?;
        require_non_empty("token", token)?;
        require_positive("ttl", ttl)?;

        let extended = self
            .store
            .compare_and_extend(&lock_key(name), token, ttl)
            .await?;
        tracing::debug!(name, extended, "lock extend");
        Ok(extended)
    }

    /// Current holder's token
    ///
    /// For diagnostics only; the answer may be stale by the time it arrives.
    pub async fn holder(&self, name: &str) -> Result<Option<String>, CoordError> {
        require_non_empty("name", name)?;
        Ok(self.store.get(&lock_key(name)).await?)
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
