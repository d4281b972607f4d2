//! TCP listener and session supervision.
//!
//! # Responsibilities
//! - Bind to the configured address with a small backlog
//! - Accept incoming print clients, one session task each
//! - Track live sessions; prune finished ones
//! - On shutdown, stop accepting and wait for every session to close

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket};
use tokio::task::JoinSet;

use crate::config::RelayConfig;
use crate::lifecycle::ShutdownSignal;
use crate::net::multiplexer::{until_ready, Wait};
use crate::net::session::{CloseReason, Session};
use crate::observability::metrics;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// The bind address did not resolve.
    Resolve(String, std::io::Error),
    /// Failed to bind to address.
    Bind(SocketAddr, std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Resolve(addr, e) => write!(f, "Failed to resolve {}: {}", addr, e),
            ListenerError::Bind(addr, e) => write!(f, "Failed to bind {}: {}", addr, e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Resolve(_, e) | ListenerError::Bind(_, e) => Some(e),
        }
    }
}

/// Accepting socket plus the registry of sessions it spawned.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    config: Arc<RelayConfig>,
    shutdown: ShutdownSignal,
    /// Live session tasks. Only this listener's task touches it.
    sessions: JoinSet<CloseReason>,
}

impl Listener {
    /// Bind to the configured address.
    pub async fn bind(
        config: Arc<RelayConfig>,
        shutdown: ShutdownSignal,
    ) -> Result<Self, ListenerError> {
        let host = config.listener.bind_address.as_str();
        let port = config.listener.port;
        let display = format!("{}:{}", host, port);

        let addr = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| ListenerError::Resolve(display.clone(), e))?
            .next()
            .ok_or_else(|| {
                ListenerError::Resolve(
                    display,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses"),
                )
            })?;

        let inner = bind_socket(addr, config.listener.backlog)
            .map_err(|e| ListenerError::Bind(addr, e))?;
        let local_addr = inner.local_addr().map_err(|e| ListenerError::Bind(addr, e))?;

        tracing::info!(
            address = %local_addr,
            upstream = %format!("{}:{}", config.upstream.host, config.upstream.port),
            "Listening for print clients"
        );

        Ok(Self {
            inner,
            config,
            shutdown,
            sessions: JoinSet::new(),
        })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Number of sessions not yet reaped.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Accept until shutdown, then wait for every session to close.
    pub async fn run(mut self) {
        let poll_interval = self.config.timing.poll_interval();

        while self.accept_once(poll_interval).await {}

        tracing::info!(
            active_sessions = self.sessions.len(),
            "Stopped accepting, waiting for sessions to close"
        );
        while let Some(joined) = self.sessions.join_next().await {
            log_join_error(joined);
        }
        tracing::info!("All sessions closed");
    }

    /// Wait at most one poll interval for a connection, then reap finished
    /// sessions. Returns `false` once shutdown is observed.
    async fn accept_once(&mut self, poll_interval: Duration) -> bool {
        let accept = tokio::time::timeout(poll_interval, self.inner.accept());

        match until_ready(accept, &mut self.shutdown, poll_interval).await {
            Wait::Cancelled => return false,
            Wait::Ready(Ok(Ok((stream, peer)))) => {
                let session = Session::new(
                    stream,
                    peer,
                    Arc::clone(&self.config),
                    self.shutdown.clone(),
                );
                tracing::info!(peer = %peer, session_id = %session.id(), "Connection accepted");
                metrics::record_session_accepted();
                self.sessions.spawn(session.run());
            }
            Wait::Ready(Ok(Err(e))) => {
                tracing::warn!(error = %e, "Failed to accept connection");
            }
            Wait::Ready(Err(_)) => {}
        }
        self.prune();
        true
    }

    fn prune(&mut self) {
        while let Some(joined) = self.sessions.try_join_next() {
            log_join_error(joined);
        }
    }
}

fn log_join_error(joined: Result<CloseReason, tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "Session task failed");
    }
}

fn bind_socket(addr: SocketAddr, backlog: u32) -> std::io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    #[cfg(unix)]
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;

    fn local_config() -> RelayConfig {
        let mut config = RelayConfig::default();
        config.listener.port = 0;
        config.timing.poll_interval_ms = 20;
        config
    }

    #[tokio::test]
    async fn binds_ephemeral_port() {
        let shutdown = Shutdown::new();
        let listener = Listener::bind(Arc::new(local_config()), shutdown.subscribe())
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
        assert_eq!(listener.active_sessions(), 0);
    }

    #[tokio::test]
    async fn bind_conflict_is_an_error() {
        let shutdown = Shutdown::new();
        let first = Listener::bind(Arc::new(local_config()), shutdown.subscribe())
            .await
            .unwrap();

        let mut config = local_config();
        config.listener.port = first.local_addr().unwrap().port();
        let err = Listener::bind(Arc::new(config), shutdown.subscribe())
            .await
            .err()
            .expect("second bind must fail");
        assert!(matches!(err, ListenerError::Bind(..)));
    }

    #[tokio::test]
    async fn idle_tick_reaps_finished_sessions() {
        let shutdown = Shutdown::new();
        let mut listener = Listener::bind(Arc::new(local_config()), shutdown.subscribe())
            .await
            .unwrap();
        listener.sessions.spawn(async { CloseReason::ClientEof });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(listener.active_sessions(), 1);

        assert!(listener.accept_once(Duration::from_millis(20)).await);
        assert_eq!(listener.active_sessions(), 0);
    }

    #[tokio::test]
    async fn accept_step_stops_once_cancelled() {
        let shutdown = Shutdown::new();
        let mut listener = Listener::bind(Arc::new(local_config()), shutdown.subscribe())
            .await
            .unwrap();
        shutdown.trigger();
        assert!(!listener.accept_once(Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn idle_listener_returns_on_shutdown() {
        let shutdown = Shutdown::new();
        let listener = Listener::bind(Arc::new(local_config()), shutdown.subscribe())
            .await
            .unwrap();
        let handle = tokio::spawn(listener.run());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("listener did not stop")
            .unwrap();
    }
}
