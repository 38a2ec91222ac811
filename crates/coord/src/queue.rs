// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Competing-consumer task queue over backend streams
//!
//! Producers append to a stream; workers in a consumer group each receive
//! distinct entries, which stay pending for them until acknowledged. A
//! failed task is re-published as a new entry to a retry stream, or to a
//! dead-letter stream once it has used up its retries. Retried tasks go to
//! the back of the line, so ordering across retries is not preserved.

use crate::error::{require_non_empty, CoordError};
use herd_core::{
    Clock, EntryId, PendingEntry, QueueConfig, RetryRequest, StreamRecord, SystemClock, TaskEntry,
    ValidationError,
};
use herd_store::{AtomicStore, GroupRead};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Where a retried task ended up
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RetryOutcome {
    Retried {
        stream: String,
        id: EntryId,
        retry_count: u32,
    },
    DeadLettered {
        stream: String,
        id: EntryId,
        retry_count: u32,
    },
}

impl RetryOutcome {
    pub fn id(&self) -> EntryId {
        match self {
            RetryOutcome::Retried { id, .. } | RetryOutcome::DeadLettered { id, .. } => *id,
        }
    }
}

#[derive(Clone)]
pub struct TaskQueue<S, C: Clock = SystemClock> {
    store: S,
    clock: C,
    limits: QueueConfig,
}

impl<S: AtomicStore> TaskQueue<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: AtomicStore, C: Clock> TaskQueue<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            limits: QueueConfig::default(),
        }
    }

    /// Caps applied to consume `count` and `block`
    pub fn with_limits(mut self, limits: QueueConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Append a task; returns the id the backend assigned
    pub async fn publish(
        &self,
        stream: &str,
        payload: &str,
        retry_count: u32,
    ) -> Result<EntryId, CoordError> {
        require_non_empty("stream", stream)?;

        let fields = TaskEntry::fields(payload, self.clock.epoch_ms(), retry_count, None);
        let id = self.store.append_to_stream(stream, &fields).await?;
        tracing::debug!(stream, %id, retry_count, "published");
        Ok(id)
    }

    /// Receive up to `count` never-delivered tasks for `consumer`
    ///
    /// With a non-zero `block` and nothing available, waits once for new
    /// tasks until the deadline or until `cancel` fires. `count` and `block`
    /// are clamped to the configured limits.
    pub async fn consume(
        &self,
        group: &str,
        consumer: &str,
        stream: &str,
        count: usize,
        block: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<TaskEntry>, CoordError> {
        require_non_empty("group", group)?;
        require_non_empty("consumer", consumer)?;
        require_non_empty("stream", stream)?;
        if count == 0 {
            return Err(ValidationError::NotPositive { field: "count" }.into());
        }

        let read = GroupRead {
            group,
            consumer,
            stream,
            count: count.min(self.limits.max_count),
            block: block.min(self.limits.max_block),
        };
        let records = self.store.read_as_consumer_group(read, cancel).await?;
        Ok(decode(stream, records))
    }

    /// Acknowledge a delivered task; returns 1 if it was pending, else 0
    pub async fn ack(&self, stream: &str, group: &str, id: EntryId) -> Result<u64, CoordError> {
        require_non_empty("stream", stream)?;
        require_non_empty("group", group)?;
        Ok(self.store.ack_entry(stream, group, id).await?)
    }

    /// Route a failed task to the retry stream or the dead-letter stream
    ///
    /// The original entry is not acknowledged; the caller does that.
    pub async fn retry(&self, request: &RetryRequest) -> Result<RetryOutcome, CoordError> {
        require_non_empty("stream", &request.stream)?;
        require_non_empty("retry_stream", &request.retry_stream)?;
        require_non_empty("dead_letter_stream", &request.dead_letter_stream)?;

        let retry_count = request.retry_count.saturating_add(1);
        let fields = TaskEntry::fields(
            &request.payload,
            self.clock.epoch_ms(),
            retry_count,
            Some(request.id),
        );

        if retry_count < request.max_retries {
            let id = self
                .store
                .append_to_stream(&request.retry_stream, &fields)
                .await?;
            tracing::info!(
                stream = %request.stream,
                original_id = %request.id,
                %id,
                retry_count,
                "task scheduled for retry"
            );
            Ok(RetryOutcome::Retried {
                stream: request.retry_stream.clone(),
                id,
                retry_count,
            })
        } else {
            let id = self
                .store
                .append_to_stream(&request.dead_letter_stream, &fields)
                .await?;
            tracing::warn!(
                stream = %request.stream,
                original_id = %request.id,
                %id,
                retry_count,
                max_retries = request.max_retries,
                "task dead-lettered"
            );
            Ok(RetryOutcome::DeadLettered {
                stream: request.dead_letter_stream.clone(),
                id,
                retry_count,
            })
        }
    }

    /// Tasks delivered to the group and not yet acknowledged
    pub async fn pending(&self, stream: &str, group: &str) -> Result<Vec<PendingEntry>, CoordError> {
        require_non_empty("stream", stream)?;
        require_non_empty("group", group)?;
        Ok(self.store.pending_entries(stream, group).await?)
    }

    /// Take over tasks another consumer has held for at least `min_idle`
    pub async fn claim_idle(
        &self,
        stream: &str,
        group: &str,
        consumer: &str,
        min_idle: Duration,
        count: usize,
    ) -> Result<Vec<TaskEntry>, CoordError> {
        require_non_empty("stream", stream)?;
        require_non_empty("group", group)?;
        require_non_empty("consumer", consumer)?;
        if count == 0 {
            return Err(ValidationError::NotPositive { field: "count" }.into());
        }

        let records = self
            .store
            .claim_idle(stream, group, consumer, min_idle, count.min(self.limits.max_count))
            .await?;
        if !records.is_empty() {
            tracing::info!(stream, group, consumer, claimed = records.len(), "claimed idle tasks");
        }
        Ok(decode(stream, records))
    }
}

fn decode(stream: &str, records: Vec<StreamRecord>) -> Vec<TaskEntry> {
    records
        .into_iter()
        .map(|record| {
            let (entry, defaulted) = TaskEntry::from_record(stream, record);
            if !defaulted.is_empty() {
                tracing::warn!(stream, id = %entry.id, ?defaulted, "entry missing task fields");
            }
            entry
        })
        .collect()
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
