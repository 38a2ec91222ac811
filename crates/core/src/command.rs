// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The command surface of the coordination layer
//!
//! Requests arrive as argument vectors (`["LOCK.ACQUIRE", "name", "tok",
//! "5000"]`). [`Command::parse`] checks arity and numeric arguments so that
//! malformed requests are rejected before any backend call is issued.

use crate::entry::EntryId;
use crate::error::ValidationError;
use std::time::Duration;

/// Arguments of a `TASK.RETRY` request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryRequest {
    pub stream: String,
    pub id: EntryId,
    pub payload: String,
    pub retry_count: u32,
    pub retry_stream: String,
    pub dead_letter_stream: String,
    pub max_retries: u32,
}

/// A validated request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Ping,
    LockAcquire {
        name: String,
        token: String,
        ttl: Duration,
    },
    LockRelease {
        name: String,
        token: String,
    },
    LockExtend {
        name: String,
        token: String,
        ttl: Duration,
    },
    LockHolder {
        name: String,
    },
    CacheRequestBuild {
        key: String,
        ttl: Duration,
        /// Accepted for compatibility; the build lock's ttl bounds the builder
        loader_timeout: Duration,
    },
    CacheComplete {
        key: String,
        value: String,
        ttl: Duration,
    },
    CacheRead {
        key: String,
    },
    TaskPublish {
        stream: String,
        payload: String,
        retry_count: u32,
    },
    TaskConsume {
        group: String,
        consumer: String,
        stream: String,
        count: usize,
        block: Duration,
    },
    TaskAck {
        stream: String,
        group: String,
        id: EntryId,
    },
    TaskRetry(RetryRequest),
    TaskPending {
        stream: String,
        group: String,
    },
    TaskClaim {
        stream: String,
        group: String,
        consumer: String,
        min_idle: Duration,
        count: usize,
    },
    RateCheck {
        identity: String,
        tag: String,
    },
}

impl Command {
    /// Parse and validate an argument vector
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Result<Command, ValidationError> {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        let Some((name, rest)) = args.split_first() else {
            return Err(ValidationError::EmptyCommand);
        };

        match name.to_ascii_uppercase().as_str() {
            "PING" => {
                arity(rest, 0, 0, "PING")?;
                Ok(Command::Ping)
            }
            "LOCK.ACQUIRE" => {
                arity(rest, 3, 3, "LOCK.ACQUIRE")?;
                Ok(Command::LockAcquire {
                    name: text("lock name", rest[0])?,
                    token: text("token", rest[1])?,
                    ttl: ttl_ms("ttl_ms", rest[2])?,
                })
            }
            "LOCK.RELEASE" => {
                arity(rest, 2, 2, "LOCK.RELEASE")?;
                Ok(Command::LockRelease {
                    name: text("lock name", rest[0])?,
                    token: text("token", rest[1])?,
                })
            }
            "LOCK.EXTEND" => {
                arity(rest, 3, 3, "LOCK.EXTEND")?;
                Ok(Command::LockExtend {
                    name: text("lock name", rest[0])?,
                    token: text("token", rest[1])?,
                    ttl: ttl_ms("ttl_ms", rest[2])?,
                })
            }
            "LOCK.HOLDER" => {
                arity(rest, 1, 1, "LOCK.HOLDER")?;
                Ok(Command::LockHolder {
                    name: text("lock name", rest[0])?,
                })
            }
            "CACHE.LOCK" => {
                arity(rest, 3, 3, "CACHE.LOCK")?;
                Ok(Command::CacheRequestBuild {
                    key: text("key", rest[0])?,
                    ttl: ttl_ms("ttl_ms", rest[1])?,
                    loader_timeout: Duration::from_millis(non_negative(
                        "loader_timeout_ms",
                        rest[2],
                    )?),
                })
            }
            "CACHE.SET" => {
                arity(rest, 3, 3, "CACHE.SET")?;
                Ok(Command::CacheComplete {
                    key: text("key", rest[0])?,
                    value: rest[1].to_string(),
                    ttl: ttl_ms("ttl_ms", rest[2])?,
                })
            }
            "CACHE.GET" => {
                arity(rest, 1, 1, "CACHE.GET")?;
                Ok(Command::CacheRead {
                    key: text("key", rest[0])?,
                })
            }
            "TASK.PUBLISH" => {
                arity(rest, 2, 3, "TASK.PUBLISH")?;
                let retry_count = match rest.get(2) {
                    Some(v) => small("retry_count", v)?,
                    None => 0,
                };
                Ok(Command::TaskPublish {
                    stream: text("stream", rest[0])?,
                    payload: rest[1].to_string(),
                    retry_count,
                })
            }
            "TASK.CONSUME" => {
                arity(rest, 3, 5, "TASK.CONSUME")?;
                let count = match rest.get(3) {
                    Some(v) => positive("count", v)?,
                    None => 1,
                };
                let block_ms = match rest.get(4) {
                    Some(v) => non_negative("block_ms", v)?,
                    None => 0,
                };
                Ok(Command::TaskConsume {
                    group: text("consumer group", rest[0])?,
                    consumer: text("consumer name", rest[1])?,
                    stream: text("stream", rest[2])?,
                    count: usize::try_from(count).unwrap_or(usize::MAX),
                    block: Duration::from_millis(block_ms),
                })
            }
            "TASK.ACK" => {
                arity(rest, 3, 3, "TASK.ACK")?;
                Ok(Command::TaskAck {
                    stream: text("stream", rest[0])?,
                    group: text("consumer group", rest[1])?,
                    id: rest[2].parse()?,
                })
            }
            "TASK.RETRY" => {
                arity(rest, 7, 7, "TASK.RETRY")?;
                Ok(Command::TaskRetry(RetryRequest {
                    stream: text("stream", rest[0])?,
                    id: rest[1].parse()?,
                    payload: rest[2].to_string(),
                    retry_count: small("retry_count", rest[3])?,
                    retry_stream: text("retry stream", rest[4])?,
                    dead_letter_stream: text("dead-letter stream", rest[5])?,
                    max_retries: small("max_retries", rest[6])?,
                }))
            }
            "TASK.PENDING" => {
                arity(rest, 2, 2, "TASK.PENDING")?;
                Ok(Command::TaskPending {
                    stream: text("stream", rest[0])?,
                    group: text("consumer group", rest[1])?,
                })
            }
            "TASK.CLAIM" => {
                arity(rest, 4, 5, "TASK.CLAIM")?;
                let count = match rest.get(4) {
                    Some(v) => positive("count", v)?,
                    None => 1,
                };
                Ok(Command::TaskClaim {
                    stream: text("stream", rest[0])?,
                    group: text("consumer group", rest[1])?,
                    consumer: text("consumer name", rest[2])?,
                    min_idle: Duration::from_millis(non_negative("min_idle_ms", rest[3])?),
                    count: usize::try_from(count).unwrap_or(usize::MAX),
                })
            }
            "RATE.CHECK" => {
                arity(rest, 2, 2, "RATE.CHECK")?;
                Ok(Command::RateCheck {
                    identity: text("identity", rest[0])?,
                    tag: rest[1].to_string(),
                })
            }
            _ => Err(ValidationError::UnknownCommand(name.to_string())),
        }
    }

    /// Wire name of the command, also used as the rate-limit tag
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping => "PING",
            Command::LockAcquire { .. } => "LOCK.ACQUIRE",
            Command::LockRelease { .. } => "LOCK.RELEASE",
            Command::LockExtend { .. } => "LOCK.EXTEND",
            Command::LockHolder { .. } => "LOCK.HOLDER",
            Command::CacheRequestBuild { .. } => "CACHE.LOCK",
            Command::CacheComplete { .. } => "CACHE.SET",
            Command::CacheRead { .. } => "CACHE.GET",
            Command::TaskPublish { .. } => "TASK.PUBLISH",
            Command::TaskConsume { .. } => "TASK.CONSUME",
            Command::TaskAck { .. } => "TASK.ACK",
            Command::TaskRetry(_) => "TASK.RETRY",
            Command::TaskPending { .. } => "TASK.PENDING",
            Command::TaskClaim { .. } => "TASK.CLAIM",
            Command::RateCheck { .. } => "RATE.CHECK",
        }
    }

    /// Render back into an argument vector accepted by [`Command::parse`]
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![self.name().to_string()];
        match self {
            Command::Ping => {}
            Command::LockAcquire { name, token, ttl } | Command::LockExtend { name, token, ttl } => {
                args.extend([name.clone(), token.clone(), millis(*ttl)]);
            }
            Command::LockRelease { name, token } => {
                args.extend([name.clone(), token.clone()]);
            }
            Command::LockHolder { name } => args.push(name.clone()),
            Command::CacheRequestBuild {
                key,
                ttl,
                loader_timeout,
            } => {
                args.extend([key.clone(), millis(*ttl), millis(*loader_timeout)]);
            }
            Command::CacheComplete { key, value, ttl } => {
                args.extend([key.clone(), value.clone(), millis(*ttl)]);
            }
            Command::CacheRead { key } => args.push(key.clone()),
            Command::TaskPublish {
                stream,
                payload,
                retry_count,
            } => {
                args.extend([stream.clone(), payload.clone(), retry_count.to_string()]);
            }
            Command::TaskConsume {
                group,
                consumer,
                stream,
                count,
                block,
            } => {
                args.extend([
                    group.clone(),
                    consumer.clone(),
                    stream.clone(),
                    count.to_string(),
                    millis(*block),
                ]);
            }
            Command::TaskAck { stream, group, id } => {
                args.extend([stream.clone(), group.clone(), id.to_string()]);
            }
            Command::TaskRetry(r) => {
                args.extend([
                    r.stream.clone(),
                    r.id.to_string(),
                    r.payload.clone(),
                    r.retry_count.to_string(),
                    r.retry_stream.clone(),
                    r.dead_letter_stream.clone(),
                    r.max_retries.to_string(),
                ]);
            }
            Command::TaskPending { stream, group } => {
                args.extend([stream.clone(), group.clone()]);
            }
            Command::TaskClaim {
                stream,
                group,
                consumer,
                min_idle,
                count,
            } => {
                args.extend([
                    stream.clone(),
                    group.clone(),
                    consumer.clone(),
                    millis(*min_idle),
                    count.to_string(),
                ]);
            }
            Command::RateCheck { identity, tag } => {
                args.extend([identity.clone(), tag.clone()]);
            }
        }
        args
    }
}

fn arity(
    rest: &[&str],
    min: usize,
    max: usize,
    command: &'static str,
) -> Result<(), ValidationError> {
    if rest.len() < min || rest.len() > max {
        return Err(ValidationError::WrongArity { command });
    }
    Ok(())
}

fn text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(value.to_string())
}

fn integer(field: &'static str, value: &str) -> Result<i64, ValidationError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidInteger {
            field,
            value: value.to_string(),
        })
}

fn non_negative(field: &'static str, value: &str) -> Result<u64, ValidationError> {
    let n = integer(field, value)?;
    u64::try_from(n).map_err(|_| ValidationError::Negative { field })
}

fn positive(field: &'static str, value: &str) -> Result<u64, ValidationError> {
    match non_negative(field, value)? {
        0 => Err(ValidationError::NotPositive { field }),
        n => Ok(n),
    }
}

fn small(field: &'static str, value: &str) -> Result<u32, ValidationError> {
    let n = non_negative(field, value)?;
    u32::try_from(n).map_err(|_| ValidationError::InvalidInteger {
        field,
        value: value.to_string(),
    })
}

fn ttl_ms(field: &'static str, value: &str) -> Result<Duration, ValidationError> {
    let n = integer(field, value)?;
    if n <= 0 {
        return Err(ValidationError::NotPositive { field });
    }
    Ok(Duration::from_millis(n.unsigned_abs()))
}

fn millis(duration: Duration) -> String {
    duration.as_millis().to_string()
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
