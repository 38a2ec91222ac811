// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend traits consumed by the coordination primitives

use crate::error::StoreError;
use async_trait::async_trait;
use herd_core::{EntryId, Fields, PendingEntry, StreamRecord};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Parameters of a consumer-group read
#[derive(Clone, Copy, Debug)]
pub struct GroupRead<'a> {
    pub group: &'a str,
    pub consumer: &'a str,
    pub stream: &'a str,
    /// Maximum number of entries to deliver
    pub count: usize,
    /// How long to wait for new entries when none are available (zero = don't wait)
    pub block: Duration,
}

/// Key-value store with expiring keys and consumer-group streams
///
/// Each method is one atomic backend operation, totally ordered with
/// respect to other calls on the same key or stream.
#[async_trait]
pub trait AtomicStore: Clone + Send + Sync + 'static {
    /// Create `key` with `value` and expiry iff no live value exists
    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Unconditional write with expiry
    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration)
        -> Result<(), StoreError>;

    /// Delete `key` iff its live value equals `expected`
    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError>;

    /// Reset the expiry of `key` iff its live value equals `expected`
    ///
    /// Never creates the key.
    async fn compare_and_extend(
        &self,
        key: &str,
        expected: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Append an entry; the store assigns a strictly increasing id
    async fn append_to_stream(&self, stream: &str, fields: &Fields)
        -> Result<EntryId, StoreError>;

    /// Deliver up to `count` never-delivered entries to `consumer`
    ///
    /// Delivered entries become pending for that consumer. With a non-zero
    /// `block`, waits once for new entries until the deadline or until
    /// `cancel` fires, then returns whatever is available (possibly nothing).
    async fn read_as_consumer_group(
        &self,
        read: GroupRead<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<StreamRecord>, StoreError>;

    /// Remove `id` from the group's pending set; returns 0 or 1
    async fn ack_entry(&self, stream: &str, group: &str, id: EntryId) -> Result<u64, StoreError>;

    async fn pending_entries(
        &self,
        stream: &str,
        group: &str,
    ) -> Result<Vec<PendingEntry>, StoreError>;

    /// Reassign up to `count` entries pending for at least `min_idle` to `consumer`
    async fn claim_idle(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        min_idle: Duration,
        count: usize,
    ) -> Result<Vec<StreamRecord>, StoreError>;

    /// Actively drop expired keys; returns how many were removed
    ///
    /// Backends that expire keys on their own can keep the default.
    async fn purge_expired(&self) -> Result<usize, StoreError> {
        Ok(0)
    }
}

/// Short conditional sequences the backend runs as one indivisible unit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Script {
    /// `keys = [value_key, lock_key]`, `args = [value, ttl_ms]`
    ///
    /// Writes `value` to `value_key` with expiry, then deletes `lock_key`
    /// whatever it holds. Replies with the number of keys deleted.
    WriteAndRelease,
}

impl Script {
    pub fn name(&self) -> &'static str {
        match self {
            Script::WriteAndRelease => "write-and-release",
        }
    }

    /// Expected (keys, args) counts
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Script::WriteAndRelease => (2, 2),
        }
    }
}

/// Reply of a script run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptReply {
    Ok,
    Int(i64),
}

/// Injectable atomic-execute capability
#[async_trait]
pub trait AtomicExecute: Clone + Send + Sync + 'static {
    async fn execute(
        &self,
        script: Script,
        keys: &[&str],
        args: &[&str],
    ) -> Result<ScriptReply, StoreError>;
}

/// A backend offering both capabilities
pub trait Backend: AtomicStore + AtomicExecute {}

impl<T: AtomicStore + AtomicExecute> Backend for T {}
