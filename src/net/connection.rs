//! Per-connection identity and the orderly close protocol.
//!
//! # Responsibilities
//! - Generate unique session IDs for tracing
//! - Name the two legs of a session
//! - Close a leg without the peer observing a reset

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Global atomic counter for session IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Generate a new unique session ID.
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// One of the two connections owned by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    /// Connection accepted from the print client.
    Client,
    /// Connection opened to the printer.
    Upstream,
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leg::Client => f.write_str("client"),
            Leg::Upstream => f.write_str("upstream"),
        }
    }
}

const DRAIN_BUFFER_SIZE: usize = 1024;

/// Close a leg in two phases: half-close our write side, then read and
/// discard until the peer reports end-of-stream, then release the socket.
///
/// Returns the number of bytes discarded. Nothing read here is forwarded.
/// With `drain_timeout` set, a peer that never sends EOF is abandoned after
/// that long with a `TimedOut` error.
pub async fn close_gracefully(
    mut stream: TcpStream,
    drain_timeout: Option<Duration>,
) -> io::Result<u64> {
    stream.shutdown().await?;

    let drained = match drain_timeout {
        Some(limit) => tokio::time::timeout(limit, drain(&mut stream))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("peer did not close within {:?}", limit),
                )
            })??,
        None => drain(&mut stream).await?,
    };

    drop(stream);
    Ok(drained)
}

async fn drain(stream: &mut TcpStream) -> io::Result<u64> {
    let mut buf = [0u8; DRAIN_BUFFER_SIZE];
    let mut discarded = 0u64;
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(discarded);
        }
        discarded += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (connected, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        (connected.unwrap(), accepted.unwrap().0)
    }

    #[test]
    fn session_id_unique() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2);
        assert!(id2.as_u64() > id1.as_u64());
        assert!(id1.to_string().starts_with("session-"));
    }

    #[tokio::test]
    async fn close_discards_late_data_and_peer_sees_eof() {
        let (ours, mut theirs) = pair().await;

        let peer = tokio::spawn(async move {
            let mut received = Vec::new();
            theirs.read_to_end(&mut received).await.unwrap();
            theirs.write_all(b"junk").await.unwrap();
            theirs.shutdown().await.unwrap();
            received
        });

        let discarded = close_gracefully(ours, None).await.unwrap();
        assert_eq!(discarded, 4);
        assert!(peer.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn close_after_peer_already_finished() {
        let (ours, mut theirs) = pair().await;
        theirs.shutdown().await.unwrap();

        let peer = tokio::spawn(async move {
            let mut received = Vec::new();
            theirs.read_to_end(&mut received).await.unwrap();
            received
        });

        assert_eq!(close_gracefully(ours, None).await.unwrap(), 0);
        assert!(peer.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn drain_timeout_abandons_silent_peer() {
        let (ours, theirs) = pair().await;

        let err = close_gracefully(ours, Some(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        drop(theirs);
    }
}
