// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake backend for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::backend::{AtomicExecute, AtomicStore, GroupRead, Script, ScriptReply};
use crate::error::StoreError;
use crate::memory::{MemoryStats, MemoryStore};
use async_trait::async_trait;
use herd_core::{EntryId, FakeClock, Fields, PendingEntry, StreamRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    SetIfAbsent { key: String, value: String, ttl: Duration },
    Get { key: String },
    Set { key: String, value: String, ttl: Duration },
    CompareAndDelete { key: String, expected: String },
    CompareAndExtend { key: String, expected: String, ttl: Duration },
    Delete { key: String },
    Append { stream: String, fields: Fields },
    ReadGroup { stream: String, group: String, consumer: String, count: usize },
    Ack { stream: String, group: String, id: EntryId },
    Pending { stream: String, group: String },
    ClaimIdle { stream: String, group: String, consumer: String },
    PurgeExpired,
    Execute { script: Script, keys: Vec<String>, args: Vec<String> },
}

/// In-memory backend driven by a [`FakeClock`] that records every call
///
/// Can be switched into an unavailable mode where every call fails with
/// [`StoreError::Unavailable`], or a stalled mode where every call hangs.
#[derive(Clone)]
pub struct FakeStore {
    inner: MemoryStore<FakeClock>,
    clock: FakeClock,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    unavailable: Arc<AtomicBool>,
    stalled: Arc<AtomicBool>,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self::with_clock(FakeClock::new())
    }
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: FakeClock) -> Self {
        Self {
            inner: MemoryStore::with_clock(clock.clone()),
            clock,
            calls: Arc::new(Mutex::new(Vec::new())),
            unavailable: Arc::new(AtomicBool::new(false)),
            stalled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn clock(&self) -> &FakeClock {
        &self.clock
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Calls made while stalled never complete
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    pub fn stats(&self) -> MemoryStats {
        self.inner.stats()
    }

    async fn record(&self, call: StoreCall) -> Result<(), StoreError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("fake backend is down".to_string()));
        }
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

#[async_trait]
impl AtomicStore for FakeStore {
    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.record(StoreCall::SetIfAbsent {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        }).await?;
        self.inner.set_if_absent_with_expiry(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.record(StoreCall::Get {
            key: key.to_string(),
        }).await?;
        self.inner.get(key).await
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        self.record(StoreCall::Set {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        }).await?;
        self.inner.set_with_expiry(key, value, ttl).await
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        self.record(StoreCall::CompareAndDelete {
            key: key.to_string(),
            expected: expected.to_string(),
        }).await?;
        self.inner.compare_and_delete(key, expected).await
    }

    async fn compare_and_extend(
        &self,
        key: &str,
        expected: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        self.record(StoreCall::CompareAndExtend {
            key: key.to_string(),
            expected: expected.to_string(),
            ttl,
        }).await?;
        self.inner.compare_and_extend(key, expected, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.record(StoreCall::Delete {
            key: key.to_string(),
        }).await?;
        self.inner.delete(key).await
    }

    async fn append_to_stream(&self, stream: &str, fields: &Fields) -> Result<EntryId, StoreError> {
        self.record(StoreCall::Append {
            stream: stream.to_string(),
            fields: fields.clone(),
        }).await?;
        self.inner.append_to_stream(stream, fields).await
    }

    async fn read_as_consumer_group(
        &self,
        read: GroupRead<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<StreamRecord>, StoreError> {
        self.record(StoreCall::ReadGroup {
            stream: read.stream.to_string(),
            group: read.group.to_string(),
            consumer: read.consumer.to_string(),
            count: read.count,
        }).await?;
        self.inner.read_as_consumer_group(read, cancel).await
    }

    async fn ack_entry(&self, stream: &str, group: &str, id: EntryId) -> Result<u64, StoreError> {
        self.record(StoreCall::Ack {
            stream: stream.to_string(),
            group: group.to_string(),
            id,
        }).await?;
        self.inner.ack_entry(stream, group, id).await
    }

    async fn pending_entries(&self, stream: &str, group: &str) -> Result<Vec<PendingEntry>, StoreError> {
        self.record(StoreCall::Pending {
            stream: stream.to_string(),
            group: group.to_string(),
        }).await?;
        self.inner.pending_entries(stream, group).await
    }

    async fn claim_idle(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        min_idle: Duration,
        count: usize,
    ) -> Result<Vec<StreamRecord>, StoreError> {
        self.record(StoreCall::ClaimIdle {
            stream: stream.to_string(),
            group: group.to_string(),
            consumer: consumer.to_string(),
        }).await?;
        self.inner
            .claim_idle(stream, group, consumer, min_idle, count)
            .await
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        self.record(StoreCall::PurgeExpired).await?;
        self.inner.purge_expired().await
    }
}

#[async_trait]
impl AtomicExecute for FakeStore {
    async fn execute(
        &self,
        script: Script,
        keys: &[&str],
        args: &[&str],
    ) -> Result<ScriptReply, StoreError> {
        self.record(StoreCall::Execute {
            script,
            keys: keys.iter().map(|k| k.to_string()).collect(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }).await?;
        self.inner.execute(script, keys, args).await
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
