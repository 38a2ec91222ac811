// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream entries and their identifiers
//!
//! A stream is an append-only log. Each entry gets a store-assigned id of
//! the form `<ms>-<seq>`, strictly increasing within its stream. Task
//! queue entries are stream entries with a fixed set of fields.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Field/value pairs of one stream entry, in insertion order
pub type Fields = Vec<(String, String)>;

pub const FIELD_PAYLOAD: &str = "payload";
pub const FIELD_TIMESTAMP: &str = "timestamp";
pub const FIELD_RETRY_COUNT: &str = "retry_count";
pub const FIELD_ORIGINAL_ID: &str = "original_id";

/// Identifier of a stream entry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryId {
    pub ms: u64,
    pub seq: u64,
}

impl EntryId {
    pub const ZERO: EntryId = EntryId { ms: 0, seq: 0 };

    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }

    /// Smallest id strictly greater than `last` at wall-clock time `now_ms`
    ///
    /// If the wall clock has not moved past `last` (or stepped backwards),
    /// the sequence number is bumped instead.
    pub fn next_after(last: EntryId, now_ms: u64) -> EntryId {
        if now_ms > last.ms {
            EntryId::new(now_ms, 0)
        } else {
            EntryId::new(last.ms, last.seq + 1)
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

impl FromStr for EntryId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidEntryId(s.to_string());
        let (ms, seq) = match s.split_once('-') {
            Some((ms, seq)) => (ms, seq),
            None => (s, "0"),
        };
        let ms = ms.parse::<u64>().map_err(|_| invalid())?;
        let seq = seq.parse::<u64>().map_err(|_| invalid())?;
        Ok(EntryId { ms, seq })
    }
}

impl TryFrom<String> for EntryId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EntryId> for String {
    fn from(id: EntryId) -> Self {
        id.to_string()
    }
}

/// A raw entry as stored in a stream
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub id: EntryId,
    pub fields: Fields,
}

impl StreamRecord {
    /// First value for `name`, if present
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// A task delivered from a queue stream
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub id: EntryId,
    pub stream: String,
    pub payload: String,
    pub timestamp_ms: u64,
    pub retry_count: u32,
    /// Id of the entry this one retries, for entries written by a retry hop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_id: Option<EntryId>,
}

impl TaskEntry {
    /// Build the stored fields of a task
    pub fn fields(
        payload: &str,
        timestamp_ms: u64,
        retry_count: u32,
        original_id: Option<EntryId>,
    ) -> Fields {
        let mut fields = vec![(FIELD_PAYLOAD.to_string(), payload.to_string())];
        if let Some(original) = original_id {
            fields.push((FIELD_ORIGINAL_ID.to_string(), original.to_string()));
        }
        fields.push((FIELD_TIMESTAMP.to_string(), timestamp_ms.to_string()));
        fields.push((FIELD_RETRY_COUNT.to_string(), retry_count.to_string()));
        fields
    }

    /// Decode a stored record
    ///
    /// Entries not written by the task queue may lack fields; missing or
    /// unparsable values fall back to empty/zero. Returns the names of the
    /// fields that had to be defaulted alongside the entry.
    pub fn from_record(stream: &str, record: StreamRecord) -> (TaskEntry, Vec<&'static str>) {
        let mut defaulted = Vec::new();

        let payload = match record.field(FIELD_PAYLOAD) {
            Some(p) => p.to_string(),
            None => {
                defaulted.push(FIELD_PAYLOAD);
                String::new()
            }
        };
        let timestamp_ms = match record.field(FIELD_TIMESTAMP).map(str::parse::<u64>) {
            Some(Ok(ts)) => ts,
            _ => {
                defaulted.push(FIELD_TIMESTAMP);
                0
            }
        };
        let retry_count = match record.field(FIELD_RETRY_COUNT).map(str::parse::<u32>) {
            Some(Ok(rc)) => rc,
            _ => {
                defaulted.push(FIELD_RETRY_COUNT);
                0
            }
        };
        let original_id = record
            .field(FIELD_ORIGINAL_ID)
            .and_then(|v| v.parse::<EntryId>().ok());

        let entry = TaskEntry {
            id: record.id,
            stream: stream.to_string(),
            payload,
            timestamp_ms,
            retry_count,
            original_id,
        };
        (entry, defaulted)
    }
}

/// An entry delivered to a consumer and not yet acknowledged
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub id: EntryId,
    pub consumer: String,
    /// Time since the entry was last delivered
    pub idle_ms: u64,
    /// How many times the entry has been delivered (1 on first delivery)
    pub delivery_count: u32,
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
