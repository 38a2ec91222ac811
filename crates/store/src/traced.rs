// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced backend wrapper for consistent observability

use crate::backend::{AtomicExecute, AtomicStore, GroupRead, Script, ScriptReply};
use crate::error::StoreError;
use async_trait::async_trait;
use herd_core::{EntryId, Fields, PendingEntry, StreamRecord};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::Instrument;
use tokio_util::sync::CancellationToken;

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Wrapper that adds tracing and an optional per-call deadline to any backend
#[derive(Clone)]
pub struct TracedStore<S> {
    inner: S,
    call_timeout: Option<Duration>,
}

impl<S> TracedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            call_timeout: None,
        }
    }

    /// Fail calls that take longer than `limit` with `StoreError::Timeout`
    ///
    /// A blocking group read gets its block duration on top of `limit`.
    pub fn with_call_timeout(mut self, limit: Duration) -> Self {
        self.call_timeout = Some(limit);
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T>(
        &self,
        extra: Duration,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let Some(limit) = self.call_timeout else {
            return call.await;
        };
        let limit = limit.saturating_add(extra);
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(StoreError::Timeout(limit)))
    }
}

#[async_trait]
impl<S: AtomicStore> AtomicStore for TracedStore<S> {
    async fn set_if_absent_with_expiry(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let span = tracing::info_span!("store.set_nx", key, ttl_ms = ttl.as_millis() as u64);
        async {
            let start = Instant::now();
            let result = self
                .bounded(Duration::ZERO, self.inner.set_if_absent_with_expiry(key, value, ttl))
                .await;
            match &result {
                Ok(set) => tracing::debug!(set, elapsed_ms = elapsed_ms(start), "done"),
                Err(e) => tracing::error!(elapsed_ms = elapsed_ms(start), error = %e, "set_nx failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let result = self.bounded(Duration::ZERO, self.inner.get(key)).await;
        match &result {
            Ok(value) => tracing::trace!(key, hit = value.is_some(), "get"),
            Err(e) => tracing::error!(key, error = %e, "get failed"),
        }
        result
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let span = tracing::info_span!("store.set", key, ttl_ms = ttl.as_millis() as u64);
        async {
            tracing::debug!(value_len = value.len(), "writing");
            let result = self
                .bounded(Duration::ZERO, self.inner.set_with_expiry(key, value, ttl))
                .await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "set failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, StoreError> {
        let span = tracing::info_span!("store.compare_and_delete", key);
        async {
            let result = self
                .bounded(Duration::ZERO, self.inner.compare_and_delete(key, expected))
                .await;
            match &result {
                Ok(deleted) => tracing::debug!(deleted, "done"),
                Err(e) => tracing::error!(error = %e, "compare_and_delete failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn compare_and_extend(
        &self,
        key: &str,
        expected: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let span = tracing::info_span!(
            "store.compare_and_extend",
            key,
            ttl_ms = ttl.as_millis() as u64
        );
        async {
            let result = self
                .bounded(Duration::ZERO, self.inner.compare_and_extend(key, expected, ttl))
                .await;
            match &result {
                Ok(extended) => tracing::debug!(extended, "done"),
                Err(e) => tracing::error!(error = %e, "compare_and_extend failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let result = self.bounded(Duration::ZERO, self.inner.delete(key)).await;
        match &result {
            Ok(deleted) => tracing::debug!(key, deleted, "delete"),
            Err(e) => tracing::error!(key, error = %e, "delete failed"),
        }
        result
    }

    async fn append_to_stream(&self, stream: &str, fields: &Fields) -> Result<EntryId, StoreError> {
        let span = tracing::info_span!("store.append", stream);
        async {
            let start = Instant::now();
            let result = self
                .bounded(Duration::ZERO, self.inner.append_to_stream(stream, fields))
                .await;
            match &result {
                Ok(id) => tracing::debug!(
                    %id,
                    field_count = fields.len(),
                    elapsed_ms = elapsed_ms(start),
                    "appended"
                ),
                Err(e) => tracing::error!(error = %e, "append failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn read_as_consumer_group(
        &self,
        read: GroupRead<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<StreamRecord>, StoreError> {
        let span = tracing::info_span!(
            "store.read_group",
            stream = read.stream,
            group = read.group,
            consumer = read.consumer
        );
        async {
            tracing::debug!(
                count = read.count,
                block_ms = read.block.as_millis() as u64,
                "reading"
            );
            let start = Instant::now();
            let result = self
                .bounded(read.block, self.inner.read_as_consumer_group(read, cancel))
                .await;
            match &result {
                Ok(records) => tracing::debug!(
                    delivered = records.len(),
                    elapsed_ms = elapsed_ms(start),
                    "read"
                ),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed_ms(start),
                    error = %e,
                    "read failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn ack_entry(&self, stream: &str, group: &str, id: EntryId) -> Result<u64, StoreError> {
        let result = self.bounded(Duration::ZERO, self.inner.ack_entry(stream, group, id)).await;
        match &result {
            Ok(acked) => tracing::debug!(stream, group, %id, acked, "ack"),
            Err(e) => tracing::error!(stream, group, %id, error = %e, "ack failed"),
        }
        result
    }

    async fn pending_entries(&self, stream: &str, group: &str) -> Result<Vec<PendingEntry>, StoreError> {
        let result = self.bounded(Duration::ZERO, self.inner.pending_entries(stream, group)).await;
        tracing::trace!(
            stream,
            group,
            pending = result.as_ref().map(|p| p.len()).ok(),
            "pending"
        );
        result
    }

    async fn claim_idle(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        min_idle: Duration,
        count: usize,
    ) -> Result<Vec<StreamRecord>, StoreError> {
        let span = tracing::info_span!("store.claim_idle", stream, group, consumer);
        async {
            let result = self
                .bounded(
                    Duration::ZERO,
                    self.inner.claim_idle(stream, group, consumer, min_idle, count),
                )
                .await;
            match &result {
                Ok(claimed) => tracing::info!(claimed = claimed.len(), "claimed"),
                Err(e) => tracing::error!(error = %e, "claim failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let result = self.bounded(Duration::ZERO, self.inner.purge_expired()).await;
        match &result {
            Ok(purged) => tracing::trace!(purged, "purged expired keys"),
            Err(e) => tracing::warn!(error = %e, "purge failed"),
        }
        result
    }
}

#[async_trait]
impl<S: AtomicExecute> AtomicExecute for TracedStore<S> {
    async fn execute(
        &self,
        script: Script,
        keys: &[&str],
        args: &[&str],
    ) -> Result<ScriptReply, StoreError> {
        let span = tracing::info_span!("store.execute", script = script.name(), ?keys);
        async {
            let start = Instant::now();
            let result = self.bounded(Duration::ZERO, self.inner.execute(script, keys, args)).await;
            match &result {
                Ok(reply) => tracing::debug!(?reply, elapsed_ms = elapsed_ms(start), "executed"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed_ms(start),
                    error = %e,
                    "script failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
