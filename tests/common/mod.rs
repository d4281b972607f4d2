//! Shared utilities for relay integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use autocut_relay::config::RelayConfig;
use autocut_relay::lifecycle::Shutdown;
use autocut_relay::net::Listener;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Upper bound for any single step of a test.
pub const STEP: Duration = Duration::from_secs(5);

/// Relay config pointing at `printer`, listening on an ephemeral port, with
/// no settle delay and a short poll interval.
pub fn relay_config(printer: SocketAddr) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1".into();
    config.listener.port = 0;
    config.upstream.host = printer.ip().to_string();
    config.upstream.port = printer.port();
    config.upstream.connect_timeout_secs = 2;
    config.timing.poll_interval_ms = 50;
    config.timing.read_settle_ms = 0;
    config
}

/// A running relay under test.
pub struct Relay {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<()>,
}

/// Bind and run a relay in the background.
pub async fn start_relay(config: RelayConfig) -> Relay {
    let shutdown = Shutdown::new();
    let listener = Listener::bind(Arc::new(config), shutdown.subscribe())
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(listener.run());
    Relay {
        addr,
        shutdown,
        handle,
    }
}

/// Start a mock printer that runs `f` for every accepted connection.
pub async fn start_printer<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(TcpStream) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let f = Arc::clone(&f);
                    tokio::spawn(async move { f(socket).await });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Await `future`, failing the test after [`STEP`].
pub async fn within<F: Future>(what: &str, future: F) -> F::Output {
    match tokio::time::timeout(STEP, future).await {
        Ok(output) => output,
        Err(_) => panic!("timed out: {what}"),
    }
}
