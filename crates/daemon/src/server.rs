// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use herd_core::Clock;
use herd_store::Backend;
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dispatch::Coordinator;
use crate::protocol::{self, Request, Response, StatusReport, PROTOCOL_VERSION};

/// State shared by every connection
pub struct ServerContext<S, C: Clock> {
    pub coordinator: Coordinator<S, C>,
    pub shutdown: CancellationToken,
    pub request_timeout: Duration,
    start_time: Instant,
    connections: AtomicUsize,
    next_connection: AtomicU64,
}

impl<S: Backend, C: Clock> ServerContext<S, C> {
    pub fn new(
        coordinator: Coordinator<S, C>,
        shutdown: CancellationToken,
        request_timeout: Duration,
    ) -> Self {
        Self {
            coordinator,
            shutdown,
            request_timeout,
            start_time: Instant::now(),
            connections: AtomicUsize::new(0),
            next_connection: AtomicU64::new(1),
        }
    }

    fn status(&self) -> StatusReport {
        let limiters = self.coordinator.limiters();
        StatusReport {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            connections: self.connections.load(Ordering::SeqCst),
            rate_limit_enabled: limiters.admission.is_enabled(),
            tracked_identities: limiters.tracked(),
        }
    }
}

/// Accept connections until shutdown is requested
pub async fn serve<S: Backend, C: Clock>(listener: &UnixListener, ctx: Arc<ServerContext<S, C>>) {
    loop {
        tokio::select! {
            _ = ctx.shutdown.cancelled() => return,
            result = listener.accept() => match result {
                Ok((stream, _)) => {
                    let id = ctx.next_connection.fetch_add(1, Ordering::SeqCst);
                    let ctx = Arc::clone(&ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(&ctx, stream, format!("conn-{id}")).await {
                            warn!(connection = id, "connection error: {}", e);
                        }
                    });
                }
                Err(e) => error!("Error accepting connection: {}", e),
            },
        }
    }
}

/// Serve requests on one connection until the client hangs up
pub async fn handle_connection<S: Backend, C: Clock>(
    ctx: &ServerContext<S, C>,
    stream: UnixStream,
    connection_id: String,
) -> Result<(), ServerError> {
    ctx.connections.fetch_add(1, Ordering::SeqCst);
    let result = serve_requests(ctx, stream, &connection_id).await;
    ctx.connections.fetch_sub(1, Ordering::SeqCst);
    result
}

async fn serve_requests<S: Backend, C: Clock>(
    ctx: &ServerContext<S, C>,
    stream: UnixStream,
    connection_id: &str,
) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();

    loop {
        let request = tokio::select! {
            _ = ctx.shutdown.cancelled() => return Ok(()),
            result = protocol::read_request(&mut reader, ctx.request_timeout) => match result {
                Ok(req) => req,
                Err(protocol::ProtocolError::ConnectionClosed) => {
                    debug!(connection_id, "client disconnected");
                    return Ok(());
                }
                Err(protocol::ProtocolError::Timeout) => {
                    debug!(connection_id, "idle connection timed out");
                    return Err(ServerError::Timeout);
                }
                Err(e) => {
                    error!(connection_id, "Failed to read request: {}", e);
                    return Err(ServerError::Protocol(e));
                }
            },
        };

        debug!(connection_id, "Received request: {:?}", request);
        let response = handle_request(ctx, request, connection_id).await;
        debug!(connection_id, "Sending response: {:?}", response);

        protocol::write_response(&mut writer, &response, ctx.request_timeout)
            .await
            .map_err(ServerError::Protocol)?;

        if matches!(response, Response::ShuttingDown) {
            return Ok(());
        }
    }
}

/// Handle a single request and return a response
pub async fn handle_request<S: Backend, C: Clock>(
    ctx: &ServerContext<S, C>,
    request: Request,
    connection_id: &str,
) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version } => {
            if version != PROTOCOL_VERSION {
                warn!(client = %version, "protocol version mismatch");
            }
            Response::Hello {
                version: PROTOCOL_VERSION.to_string(),
            }
        }

        Request::Status => Response::Status(ctx.status()),

        Request::Shutdown => {
            info!("Shutdown requested via IPC");
            ctx.shutdown.cancel();
            Response::ShuttingDown
        }

        Request::Command { identity, args } => {
            let identity = identity.as_deref().unwrap_or(connection_id);
            ctx.coordinator.handle(identity, &args).await
        }
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Request timeout")]
    Timeout,
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
