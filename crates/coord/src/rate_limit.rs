// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-identity fixed-window rate limiting
//!
//! Each identity gets a counter that resets once its window has elapsed.
//! The table is bounded; what happens when it is full and a new identity
//! shows up is governed by [`SaturationPolicy`].

use herd_core::{Clock, RateLimitConfig, SaturationPolicy, SystemClock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Window {
    start: Instant,
    count: u64,
    /// Table tick of the most recent check, for least-recent eviction
    last_seen: u64,
}

#[derive(Debug, Default)]
struct Table {
    windows: HashMap<String, Window>,
    tick: u64,
    /// Set while fail-open is letting untracked identities through
    saturated: bool,
}

impl Table {
    fn evict_least_recent(&mut self) -> Option<String> {
        let oldest = self
            .windows
            .iter()
            .min_by_key(|(_, w)| w.last_seen)
            .map(|(identity, _)| identity.clone())?;
        self.windows.remove(&oldest);
        Some(oldest)
    }
}

/// Current state of one identity's window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowUsage {
    pub count: u64,
    pub limit: u64,
    /// Time left until the window resets
    pub resets_in: Duration,
}

pub struct RateLimiter<C: Clock = SystemClock> {
    window: Duration,
    max_requests: u64,
    capacity: usize,
    on_full: SaturationPolicy,
    enabled: AtomicBool,
    table: Mutex<Table>,
    clock: C,
}

impl RateLimiter<SystemClock> {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(config: &RateLimitConfig, clock: C) -> Self {
        Self {
            window: config.window,
            max_requests: config.max_requests,
            capacity: config.capacity,
            on_full: config.on_full,
            enabled: AtomicBool::new(config.enabled),
            table: Mutex::new(Table::default()),
            clock,
        }
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        if was != enabled {
            tracing::info!(enabled, "rate limiting toggled");
        }
    }

    /// Count a request from `identity` and decide whether to admit it
    ///
    /// `tag` only labels the diagnostic logged when an identity first goes
    /// over its limit in a window.
    pub fn check(&self, identity: &str, tag: &str) -> bool {
        if !self.is_enabled() {
            return true;
        }

        let now = self.clock.now();
        let mut table = self.table();
        table.tick += 1;
        let tick = table.tick;

        if !table.windows.contains_key(identity) && table.windows.len() >= self.capacity {
            match self.on_full {
                SaturationPolicy::EvictLeastRecent => {
                    if let Some(evicted) = table.evict_least_recent() {
                        tracing::debug!(%evicted, identity, "rate limit table full, evicted");
                    }
                }
                SaturationPolicy::FailOpen => {
                    if !table.saturated {
                        table.saturated = true;
                        tracing::warn!(
                            identity,
                            capacity = self.capacity,
                            "CapacityExceeded: rate limit table full, admitting untracked identities"
                        );
                    }
                    return true;
                }
            }
        }
        if table.saturated && table.windows.len() < self.capacity {
            table.saturated = false;
        }

        let window = table
            .windows
            .entry(identity.to_string())
            .or_insert(Window {
                start: now,
                count: 0,
                last_seen: tick,
            });
        window.last_seen = tick;
        if now.saturating_duration_since(window.start) >= self.window {
            window.start = now;
            window.count = 0;
        }
        window.count += 1;

        if window.count > self.max_requests {
            if window.count == self.max_requests + 1 {
                tracing::warn!(
                    identity,
                    tag,
                    count = window.count,
                    window_secs = self.window.as_secs(),
                    limit = self.max_requests,
                    "rate limit exceeded"
                );
            }
            return false;
        }
        true
    }

    pub fn usage(&self, identity: &str) -> Option<WindowUsage> {
        let now = self.clock.now();
        let table = self.table();
        let window = table.windows.get(identity)?;
        let elapsed = now.saturating_duration_since(window.start);
        if elapsed >= self.window {
            return None;
        }
        Some(WindowUsage {
            count: window.count,
            limit: self.max_requests,
            resets_in: self.window - elapsed,
        })
    }

    /// Forget `identity`; returns whether it was tracked
    pub fn reset(&self, identity: &str) -> bool {
        self.table().windows.remove(identity).is_some()
    }

    /// Number of identities currently tracked
    pub fn tracked(&self) -> usize {
        self.table().windows.len()
    }

    /// Drop identities whose window has elapsed; returns how many
    pub fn prune_idle(&self) -> usize {
        let now = self.clock.now();
        let mut table = self.table();
        let before = table.windows.len();
        let window = self.window;
        table
            .windows
            .retain(|_, w| now.saturating_duration_since(w.start) < window);
        before - table.windows.len()
    }

    pub fn clear(&self) {
        let mut table = self.table();
        table.windows.clear();
        table.saturated = false;
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
