//! Relay session: one print client paired with one printer connection.
//!
//! # State Machine
//! ```text
//! Establishing ──connect ok──▶ Forwarding ──EOF / error / shutdown──▶ Closing ──▶ Closed
//!      │                                                                 ▲
//!      └──────────────connect failed (client leg only)───────────────────┘
//! ```
//!
//! Forwarding is symmetric apart from two things: the read size differs per
//! direction, and only printer-bound chunks go through the payload rewriter.

use std::borrow::Cow;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::Instrument;

use crate::config::RelayConfig;
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::{close_gracefully, Leg, SessionId};
use crate::net::multiplexer::{wait_readable, Wait};
use crate::observability::metrics;
use crate::payload::{self, Direction};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Opening the printer connection.
    Establishing,
    /// Relaying bytes in both directions.
    Forwarding,
    /// Half-closing and draining both legs.
    Closing,
    /// Both legs released.
    Closed,
}

/// Why a session stopped forwarding.
#[derive(Debug)]
pub enum CloseReason {
    /// The printer connection could not be opened.
    UpstreamUnreachable(io::Error),
    /// The client sent end-of-stream.
    ClientEof,
    /// The printer sent end-of-stream.
    UpstreamEof,
    /// Process shutdown was requested.
    Cancelled,
    /// Reading a leg failed.
    ReadFailed(Leg, io::Error),
    /// Writing a leg failed.
    WriteFailed(Leg, io::Error),
}

impl CloseReason {
    /// Short label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::UpstreamUnreachable(_) => "upstream_unreachable",
            CloseReason::ClientEof => "client_eof",
            CloseReason::UpstreamEof => "upstream_eof",
            CloseReason::Cancelled => "cancelled",
            CloseReason::ReadFailed(..) => "read_failed",
            CloseReason::WriteFailed(..) => "write_failed",
        }
    }
}

const CLIENT: usize = 0;
const UPSTREAM: usize = 1;

/// A client connection waiting to be paired with the printer.
pub struct Session {
    id: SessionId,
    peer: SocketAddr,
    client: TcpStream,
    config: Arc<RelayConfig>,
    shutdown: ShutdownSignal,
}

impl Session {
    pub fn new(
        client: TcpStream,
        peer: SocketAddr,
        config: Arc<RelayConfig>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            id: SessionId::new(),
            peer,
            client,
            config,
            shutdown,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Run the session to completion. Never fails: every error ends this
    /// session only and is reported through the returned reason.
    pub async fn run(self) -> CloseReason {
        let span = tracing::info_span!("session", session_id = %self.id, peer = %self.peer);
        self.relay().instrument(span).await
    }

    async fn relay(self) -> CloseReason {
        let Session {
            mut client,
            config,
            mut shutdown,
            ..
        } = self;
        let drain_timeout = config.timing.drain_timeout();
        let mut state = SessionState::Establishing;

        let reason = match connect_upstream(&config).await {
            Ok(mut upstream) => {
                transition(&mut state, SessionState::Forwarding);
                let reason = forward(&mut client, &mut upstream, &config, &mut shutdown).await;

                transition(&mut state, SessionState::Closing);
                close_leg(Leg::Upstream, upstream, drain_timeout).await;
                close_leg(Leg::Client, client, drain_timeout).await;
                reason
            }
            Err(e) => {
                tracing::warn!(
                    host = %config.upstream.host,
                    port = config.upstream.port,
                    error = %e,
                    "Printer unreachable, closing client"
                );
                metrics::record_upstream_connect_failure();

                transition(&mut state, SessionState::Closing);
                close_leg(Leg::Client, client, drain_timeout).await;
                CloseReason::UpstreamUnreachable(e)
            }
        };
        transition(&mut state, SessionState::Closed);

        metrics::record_session_closed(reason.as_str());
        tracing::info!(reason = reason.as_str(), "Session closed");
        reason
    }
}

fn transition(state: &mut SessionState, next: SessionState) {
    tracing::debug!(from = ?state, to = ?next, "Session state");
    *state = next;
}

async fn connect_upstream(config: &RelayConfig) -> io::Result<TcpStream> {
    let upstream = &config.upstream;
    let limit = Duration::from_secs(upstream.connect_timeout_secs);

    let stream = tokio::time::timeout(
        limit,
        TcpStream::connect((upstream.host.as_str(), upstream.port)),
    )
    .await
    .map_err(|_| {
        io::Error::new(
            io::ErrorKind::TimedOut,
            format!("connect timed out after {:?}", limit),
        )
    })??;

    if let Ok(addr) = stream.peer_addr() {
        tracing::debug!(upstream = %addr, "Printer connected");
    }
    Ok(stream)
}

/// Relay chunks between the legs until one ends, fails, or shutdown is seen.
async fn forward(
    client: &mut TcpStream,
    upstream: &mut TcpStream,
    config: &RelayConfig,
    shutdown: &mut ShutdownSignal,
) -> CloseReason {
    let poll_interval = config.timing.poll_interval();
    let settle = config.timing.read_settle();
    let max_descriptor_size = config.limits.max_descriptor_size;

    // One buffer per direction, reused for every read. Capacity is reserved
    // on demand and never zeroed, so only bytes actually received are touched.
    let mut client_buf = Vec::new();
    let mut upstream_buf = Vec::new();

    loop {
        let ready = match wait_readable(&[&*client, &*upstream], shutdown, poll_interval).await {
            Wait::Ready(ready) => ready,
            Wait::Cancelled => return CloseReason::Cancelled,
        };

        for index in ready {
            let (direction, src_leg, dst_leg, src, dst, buf, read_size) = if index == CLIENT {
                (
                    Direction::ClientToUpstream,
                    Leg::Client,
                    Leg::Upstream,
                    &*client,
                    &mut *upstream,
                    &mut client_buf,
                    config.limits.max_image_chunk,
                )
            } else {
                debug_assert_eq!(index, UPSTREAM);
                (
                    Direction::UpstreamToClient,
                    Leg::Upstream,
                    Leg::Client,
                    &*upstream,
                    &mut *client,
                    &mut upstream_buf,
                    max_descriptor_size,
                )
            };

            // Readiness left over from the previous read is cleared by a peek
            // that would block; only settle once data is really waiting.
            let mut peeked = [0u8; 1];
            match src.peek(&mut peeked).now_or_never() {
                None => continue,
                Some(Ok(0)) | Some(Err(_)) => {}
                Some(Ok(_)) => settle_delay(settle, shutdown).await,
            }

            buf.clear();
            buf.reserve_exact(read_size);
            let n = match src.try_read_buf(buf) {
                Ok(0) => {
                    return match src_leg {
                        Leg::Client => CloseReason::ClientEof,
                        Leg::Upstream => CloseReason::UpstreamEof,
                    };
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return CloseReason::ReadFailed(src_leg, e),
            };

            let chunk = payload::process(&buf[..n], direction, max_descriptor_size);
            if let Err(e) = dst.write_all(&chunk).await {
                return CloseReason::WriteFailed(dst_leg, e);
            }

            tracing::trace!(
                %direction,
                read = n,
                written = chunk.len(),
                rewritten = matches!(chunk, Cow::Owned(_)),
                "Chunk forwarded"
            );
            metrics::record_forwarded(direction, chunk.len());
        }
    }
}

/// Give the peer a moment to finish its message before reading it. Returns
/// early on shutdown; the read still happens.
async fn settle_delay(delay: Duration, shutdown: &mut ShutdownSignal) {
    if delay.is_zero() {
        return;
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        _ = shutdown.cancelled() => {}
    }
}

async fn close_leg(leg: Leg, stream: TcpStream, drain_timeout: Option<Duration>) {
    match close_gracefully(stream, drain_timeout).await {
        Ok(discarded) => tracing::debug!(%leg, discarded, "Leg closed"),
        Err(e) => tracing::debug!(%leg, error = %e, "Leg closed abruptly"),
    }
}
