// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routes parsed commands to the coordination primitives

use std::sync::Arc;

use herd_coord::{CacheStampedeGuard, CoordError, ErrorKind, LockManager, RateLimiter, TaskQueue};
use herd_core::{Clock, Command, QueueConfig, RateLimitConfig};
use herd_store::Backend;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::protocol::{Reply, Response};

/// The daemon's two rate-limit tables
///
/// `admission` gates every request by connection identity. `checks` backs
/// `RATE.CHECK` and is never touched by admission, so a caller's own traffic
/// does not spend the budget of the identity it asks about.
#[derive(Clone)]
pub struct Limiters<C: Clock> {
    pub admission: Arc<RateLimiter<C>>,
    pub checks: Arc<RateLimiter<C>>,
}

impl<C: Clock> Limiters<C> {
    /// Both tables share one set of settings
    pub fn with_clock(config: &RateLimitConfig, clock: C) -> Self {
        Self {
            admission: Arc::new(RateLimiter::with_clock(config, clock.clone())),
            checks: Arc::new(RateLimiter::with_clock(config, clock)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<RateLimiter<C>>> {
        [&self.admission, &self.checks].into_iter()
    }

    /// Identities tracked across both tables
    pub fn tracked(&self) -> usize {
        self.iter().map(|limiter| limiter.tracked()).sum()
    }

    pub fn clear(&self) {
        self.iter().for_each(|limiter| limiter.clear());
    }
}

/// Owns one instance of every primitive over a shared backend
pub struct Coordinator<S, C: Clock> {
    locks: LockManager<S>,
    cache: CacheStampedeGuard<S>,
    queue: TaskQueue<S, C>,
    limiters: Limiters<C>,
    /// Fires on shutdown so blocked consumes return early
    shutdown: CancellationToken,
}

impl<S: Backend, C: Clock> Coordinator<S, C> {
    pub fn new(
        store: S,
        clock: C,
        limiters: Limiters<C>,
        queue_limits: QueueConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            locks: LockManager::new(store.clone()),
            cache: CacheStampedeGuard::new(store.clone()),
            queue: TaskQueue::with_clock(store, clock).with_limits(queue_limits),
            limiters,
            shutdown,
        }
    }

    pub fn limiters(&self) -> &Limiters<C> {
        &self.limiters
    }

    /// Admit, parse and run one command
    ///
    /// The admission limiter sees every request, including malformed ones.
    pub async fn handle(&self, identity: &str, args: &[String]) -> Response {
        let tag = args
            .first()
            .map(|name| name.to_ascii_uppercase())
            .unwrap_or_default();
        if !self.limiters.admission.check(identity, &tag) {
            return Response::Error {
                kind: ErrorKind::RateLimited,
                message: format!("rate limit exceeded for '{identity}'"),
            };
        }

        let command = match Command::parse(args) {
            Ok(command) => command,
            Err(e) => {
                debug!(identity, %tag, error = %e, "rejected command");
                return Response::Error {
                    kind: ErrorKind::Validation,
                    message: e.to_string(),
                };
            }
        };

        match self.execute(command).await {
            Ok(reply) => Response::Reply { reply },
            Err(e) => Response::Error {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }

    pub async fn execute(&self, command: Command) -> Result<Reply, CoordError> {
        let reply = match command {
            Command::Ping => Reply::Text("PONG".to_string()),

            Command::LockAcquire { name, token, ttl } => {
                Reply::Bool(self.locks.acquire(&name, &token, ttl).await?)
            }
            Command::LockRelease { name, token } => {
                Reply::Bool(self.locks.release(&name, &token).await?)
            }
            Command::LockExtend { name, token, ttl } => {
                Reply::Bool(self.locks.extend(&name, &token, ttl).await?)
            }
            Command::LockHolder { name } => text_or_nil(self.locks.holder(&name).await?),

            Command::CacheRequestBuild { key, ttl, .. } => {
                Reply::Text(self.cache.request_build(&key, ttl).await?.to_string())
            }
            Command::CacheComplete { key, value, ttl } => {
                self.cache.complete(&key, &value, ttl).await?;
                Reply::Ok
            }
            Command::CacheRead { key } => text_or_nil(self.cache.read(&key).await?),

            Command::TaskPublish {
                stream,
                payload,
                retry_count,
            } => Reply::Id(self.queue.publish(&stream, &payload, retry_count).await?),
            Command::TaskConsume {
                group,
                consumer,
                stream,
                count,
                block,
            } => Reply::Entries(
                self.queue
                    .consume(&group, &consumer, &stream, count, block, &self.shutdown)
                    .await?,
            ),
            Command::TaskAck { stream, group, id } => {
                Reply::Int(self.queue.ack(&stream, &group, id).await?)
            }
            Command::TaskRetry(request) => {
                self.queue.retry(&request).await?;
                Reply::Ok
            }
            Command::TaskPending { stream, group } => {
                Reply::Pending(self.queue.pending(&stream, &group).await?)
            }
            Command::TaskClaim {
                stream,
                group,
                consumer,
                min_idle,
                count,
            } => Reply::Entries(
                self.queue
                    .claim_idle(&stream, &group, &consumer, min_idle, count)
                    .await?,
            ),

            Command::RateCheck { identity, tag } => {
                Reply::Bool(self.limiters.checks.check(&identity, &tag))
            }
        };
        Ok(reply)
    }
}

fn text_or_nil(value: Option<String>) -> Reply {
    match value {
        Some(text) => Reply::Text(text),
        None => Reply::Nil,
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
