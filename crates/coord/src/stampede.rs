// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight guard around cache population
//!
//! The first caller to miss a key is told to LOAD and holds a build lock
//! (`lock:<key>`) until it completes or the lock expires. Everyone else is
//! told to WAIT and re-read later.

use crate::error::{require_non_empty, require_positive, CoordError};
use crate::lock::lock_key;
use herd_store::{Backend, Script};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Value stored in a build lock
pub const BUILD_LOCK_VALUE: &str = "1";

/// What a caller should do after a cache miss
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BuildDecision {
    /// Build the value, then call `complete`
    Load,
    /// Someone else is building it
    Wait,
}

impl fmt::Display for BuildDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildDecision::Load => f.write_str("LOAD"),
            BuildDecision::Wait => f.write_str("WAIT"),
        }
    }
}

#[derive(Clone)]
pub struct CacheStampedeGuard<S> {
    store: S,
}

impl<S: Backend> CacheStampedeGuard<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Claim the build of `key` for `ttl`
    pub async fn request_build(&self, key: &str, ttl: Duration) -> Result<BuildDecision, CoordError> {
        require_non_empty("key", key)?;
        require_positive("ttl", ttl)?;

        let granted = self
            .store
            .set_if_absent_with_expiry(&lock_key(key), BUILD_LOCK_VALUE, ttl)
            .await?;
        let decision = if granted {
            BuildDecision::Load
        } else {
            BuildDecision::Wait
        };
        tracing::debug!(key, %decision, "build requested");
        Ok(decision)
    }

    /// Store the built value and drop the build lock
    ///
    /// The lock is dropped whoever holds it. If the original builder's lock
    /// expired and a second builder took over, completing the first build
    /// releases the second builder's lock too.
    pub async fn complete(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CoordError> {
        require_non_empty("key", key)?;
        require_positive("ttl", ttl)?;

        let lock = lock_key(key);
        let ttl_ms = ttl.as_millis().to_string();
        let reply = self
            .store
            .execute(Script::WriteAndRelease, &[key, lock.as_str()], &[value, ttl_ms.as_str()])
            .await?;
        tracing::debug!(key, ?reply, "build completed");
        Ok(())
    }

    pub async fn read(&self, key: &str) -> Result<Option<String>, CoordError> {
        require_non_empty("key", key)?;
        Ok(self.store.get(key).await?)
    }
}

#[cfg(test)]
#[path = "stampede_tests.rs"]
mod tests;
