// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process backend
//!
//! All state lives behind a single mutex, so every trait call (and every
//! script) is trivially atomic. Expired keys are dropped lazily on access
//! and actively by [`AtomicStore::purge_expired`]. Nothing is persisted.

use crate::backend::{AtomicExecute, AtomicStore, GroupRead, Script, ScriptReply};
use crate::error::StoreError;
use async_trait::async_trait;
use herd_core::{Clock, EntryId, Fields, PendingEntry, StreamRecord, SystemClock};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct Value {
    data: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Stream {
    entries: BTreeMap<EntryId, Fields>,
    last_id: EntryId,
    groups: HashMap<String, Group>,
}

#[derive(Debug, Default)]
struct Group {
    /// Highest id ever delivered to this group
    last_delivered: EntryId,
    pending: BTreeMap<EntryId, Delivery>,
}

#[derive(Debug)]
struct Delivery {
    consumer: String,
    delivered_at: Instant,
    count: u32,
}

#[derive(Debug, Default)]
struct Keyspace {
    values: HashMap<String, Value>,
    streams: HashMap<String, Stream>,
}

impl Keyspace {
    /// Live value for `key`, dropping it first if it has expired
    fn live(&mut self, key: &str, now: Instant) -> Option<&mut Value> {
        if self.values.get(key).is_some_and(|v| v.expires_at <= now) {
            self.values.remove(key);
        }
        self.values.get_mut(key)
    }

    fn ensure_not_stream(&self, key: &str) -> Result<(), StoreError> {
        if self.streams.contains_key(key) {
            return Err(StoreError::WrongType(key.to_string()));
        }
        Ok(())
    }

    fn write(&mut self, key: &str, value: &str, ttl: Duration, now: Instant) -> Result<(), StoreError> {
        self.ensure_not_stream(key)?;
        self.values.insert(
            key.to_string(),
            Value {
                data: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    /// Stream at `key`, created empty if missing
    fn stream_mut(&mut self, key: &str, now: Instant) -> Result<&mut Stream, StoreError> {
        if self.live(key, now).is_some() {
            return Err(StoreError::WrongType(key.to_string()));
        }
        Ok(self.streams.entry(key.to_string()).or_default())
    }

    fn deliver(&mut self, read: &GroupRead<'_>, now: Instant) -> Result<Vec<StreamRecord>, StoreError> {
        let stream = self.stream_mut(read.stream, now)?;
        let group = stream.groups.entry(read.group.to_string()).or_default();

        let records: Vec<StreamRecord> = stream
            .entries
            .range((Bound::Excluded(group.last_delivered), Bound::Unbounded))
            .take(read.count)
            .map(|(id, fields)| StreamRecord {
                id: *id,
                fields: fields.clone(),
            })
            .collect();

        for record in &records {
            group.pending.insert(
                record.id,
                Delivery {
                    consumer: read.consumer.to_string(),
                    delivered_at: now,
                    count: 1,
                },
            );
        }
        if let Some(last) = records.last() {
            group.last_delivered = last.id;
        }
        Ok(records)
    }
}

/// Counts of what the store currently holds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Keys with a value, including expired ones not yet purged
    pub values: usize,
    pub streams: usize,
    /// Pending entries across all groups
    pub pending: usize,
}

/// Volatile single-node backend
#[derive(Clone)]
pub struct MemoryStore<C: Clock = SystemClock> {
    keyspace: Arc<Mutex<Keyspace>>,
    appended: Arc<Notify>,
    clock: C,
}

impl MemoryStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            keyspace: Arc::new(Mutex::new(Keyspace::default())),
            appended: Arc::new(Notify::new()),
            clock,
        }
    }

    pub fn stats(&self) -> MemoryStats {
        let keyspace = self.keyspace();
        MemoryStats {
            values: keyspace.values.len(),
            streams: keyspace.streams.len(),
            pending: keyspace
                .streams
                .values()
                .flat_map(|s| s.groups.values())
                .map(|g| g.pending.len())
                .sum(),
        }
    }

    fn keyspace(&self) -> MutexGuard<'_, Keyspace> {
        self.keyspace.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl<C: Clock> AtomicStore for MemoryStore<C> {
    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut keyspace = self.keyspace();
        keyspace.ensure_not_stream(key)?;
        if keyspace.live(key, now).is_some() {
            return Ok(false);
        }
        keyspace.write(key, value, ttl, now)?;
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = self.clock.now();
        let mut keyspace = self.keyspace();
        keyspace.ensure_not_stream(key)?;
        Ok(keyspace.live(key, now).map(|v| v.data.clone()))
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.keyspace().write(key, value, ttl, now)
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut keyspace = self.keyspace();
        keyspace.ensure_not_stream(key)?;
        let matches = keyspace.live(key, now).is_some_and(|v| v.data == expected);
        if matches {
            keyspace.values.remove(key);
        }
        Ok(matches)
    }

    async fn compare_and_extend(
        &self,
        key: &str,
        expected: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut keyspace = self.keyspace();
        keyspace.ensure_not_stream(key)?;
        match keyspace.live(key, now) {
            Some(value) if value.data == expected => {
                value.expires_at = now + ttl;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut keyspace = self.keyspace();
        if keyspace.live(key, now).is_some() {
            keyspace.values.remove(key);
            return Ok(true);
        }
        Ok(keyspace.streams.remove(key).is_some())
    }

    async fn append_to_stream(&self, stream: &str, fields: &Fields) -> Result<EntryId, StoreError> {
        let now = self.clock.now();
        let epoch_ms = self.clock.epoch_ms();
        let id = {
            let mut keyspace = self.keyspace();
            let stream = keyspace.stream_mut(stream, now)?;
            let id = EntryId::next_after(stream.last_id, epoch_ms);
            stream.entries.insert(id, fields.clone());
            stream.last_id = id;
            id
        };
        self.appended.notify_waiters();
        Ok(id)
    }

    async fn read_as_consumer_group(
        &self,
        read: GroupRead<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<StreamRecord>, StoreError> {
        let deadline = (!read.block.is_zero()).then(|| tokio::time::Instant::now() + read.block);

        loop {
            // Register for wakeups before looking, so an append landing
            // between the check and the wait is not missed.
            let notified = self.appended.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let records = {
                let mut keyspace = self.keyspace();
                keyspace.deliver(&read, self.clock.now())?
            };
            if !records.is_empty() {
                return Ok(records);
            }
            let Some(deadline) = deadline else {
                return Ok(records);
            };

            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep_until(deadline) => return Ok(Vec::new()),
                _ = cancel.cancelled() => return Ok(Vec::new()),
            }
        }
    }

    async fn ack_entry(&self, stream: &str, group: &str, id: EntryId) -> Result<u64, StoreError> {
        let mut keyspace = self.keyspace();
        let removed = keyspace
            .streams
            .get_mut(stream)
            .and_then(|s| s.groups.get_mut(group))
            .and_then(|g| g.pending.remove(&id))
            .is_some();
        Ok(u64::from(removed))
    }

    async fn pending_entries(&self, stream: &str, group: &str) -> Result<Vec<PendingEntry>, StoreError> {
        let now = self.clock.now();
        let keyspace = self.keyspace();
        let Some(group) = keyspace.streams.get(stream).and_then(|s| s.groups.get(group)) else {
            return Ok(Vec::new());
        };
        Ok(group
            .pending
            .iter()
            .map(|(id, delivery)| PendingEntry {
                id: *id,
                consumer: delivery.consumer.clone(),
                idle_ms: millis(now.saturating_duration_since(delivery.delivered_at)),
                delivery_count: delivery.count,
            })
            .collect())
    }

    async fn claim_idle(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        min_idle: Duration,
        count: usize,
    ) -> Result<Vec<StreamRecord>, StoreError> {
        let now = self.clock.now();
        let mut keyspace = self.keyspace();
        if keyspace.live(stream, now).is_some() {
            return Err(StoreError::WrongType(stream.to_string()));
        }
        let Some(stream) = keyspace.streams.get_mut(stream) else {
            return Ok(Vec::new());
        };
        let Some(group) = stream.groups.get_mut(group) else {
            return Ok(Vec::new());
        };

        let mut claimed = Vec::new();
        for (id, delivery) in group.pending.iter_mut() {
            if claimed.len() >= count {
                break;
            }
            if now.saturating_duration_since(delivery.delivered_at) < min_idle {
                continue;
            }
            let Some(fields) = stream.entries.get(id) else {
                continue;
            };
            delivery.consumer = consumer.to_string();
            delivery.delivered_at = now;
            delivery.count += 1;
            claimed.push(StreamRecord {
                id: *id,
                fields: fields.clone(),
            });
        }
        Ok(claimed)
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut keyspace = self.keyspace();
        let before = keyspace.values.len();
        keyspace.values.retain(|_, v| v.expires_at > now);
        Ok(before - keyspace.values.len())
    }
}

#[async_trait]
impl<C: Clock> AtomicExecute for MemoryStore<C> {
    async fn execute(
        &self,
        script: Script,
        keys: &[&str],
        args: &[&str],
    ) -> Result<ScriptReply, StoreError> {
        let (want_keys, want_args) = script.arity();
        if keys.len() != want_keys || args.len() != want_args {
            return Err(StoreError::Script {
                script: script.name(),
                message: format!(
                    "expected {} keys and {} args, got {} and {}",
                    want_keys,
                    want_args,
                    keys.len(),
                    args.len()
                ),
            });
        }

        match script {
            Script::WriteAndRelease => {
                let ttl_ms = args[1].parse::<u64>().map_err(|_| StoreError::Script {
                    script: script.name(),
                    message: format!("invalid ttl_ms '{}'", args[1]),
                })?;
                let now = self.clock.now();
                let mut keyspace = self.keyspace();
                // Both keys are checked before anything is written.
                keyspace.ensure_not_stream(keys[0])?;
                keyspace.ensure_not_stream(keys[1])?;
                keyspace.write(keys[0], args[0], Duration::from_millis(ttl_ms), now)?;
                let released = keyspace.live(keys[1], now).is_some();
                if released {
                    keyspace.values.remove(keys[1]);
                }
                Ok(ScriptReply::Int(i64::from(released)))
            }
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
