// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic housekeeping
//!
//! Drops expired keys from backends that don't expire them on their own,
//! and forgets rate-limit identities whose window has passed.

use crate::error::CoordError;
use crate::rate_limit::RateLimiter;
use herd_core::{Clock, MaintenanceConfig};
use herd_store::AtomicStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// What one sweep removed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub expired_keys: usize,
    pub idle_identities: usize,
}

pub struct Sweeper<S, C: Clock> {
    store: S,
    limiters: Vec<Arc<RateLimiter<C>>>,
    interval: Duration,
}

impl<S: AtomicStore, C: Clock> Sweeper<S, C> {
    pub fn new(store: S, limiters: Vec<Arc<RateLimiter<C>>>, config: &MaintenanceConfig) -> Self {
        Self {
            store,
            limiters,
            interval: config.interval,
        }
    }

    /// Run a single sweep
    pub async fn tick(&self) -> Result<SweepStats, CoordError> {
        let expired_keys = self.store.purge_expired().await?;
        let idle_identities = self.limiters.iter().map(|l| l.prune_idle()).sum::<usize>();
        Ok(SweepStats {
            expired_keys,
            idle_identities,
        })
    }

    /// Sweep every interval until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("sweeper stopped");
                    return;
                }
                _ = interval.tick() => {}
            }

            match self.tick().await {
                Ok(stats) if stats != SweepStats::default() => tracing::debug!(
                    expired_keys = stats.expired_keys,
                    idle_identities = stats.idle_identities,
                    "sweep"
                ),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "sweep failed"),
            }
        }
    }
}

#[cfg(test)]
#[path = "maintenance_tests.rs"]
mod tests;
