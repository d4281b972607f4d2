//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Translate signals into the shutdown trigger
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The handler task only triggers; draining happens in the coordinator
//! - Repeated SIGTERM/SIGINT after the first are logged and ignored

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Shutdown;

/// Register termination signal handlers and spawn the task that forwards them
/// to `shutdown`.
///
/// Registration errors are returned immediately so startup can fail fast.
#[cfg(unix)]
pub fn install(shutdown: Shutdown) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                _ = interrupt.recv() => "SIGINT",
                _ = terminate.recv() => "SIGTERM",
            };
            deliver(&shutdown, name);
        }
    }))
}

#[cfg(not(unix))]
pub fn install(shutdown: Shutdown) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                return;
            }
            deliver(&shutdown, "Ctrl+C");
        }
    }))
}

fn deliver(shutdown: &Shutdown, name: &str) {
    if shutdown.trigger() {
        tracing::info!(signal = name, "Shutdown signal received, draining sessions");
    } else {
        tracing::debug!(signal = name, "Shutdown already in progress");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redelivery_is_a_noop() {
        let shutdown = Shutdown::new();
        deliver(&shutdown, "SIGTERM");
        assert!(shutdown.is_triggered());
        deliver(&shutdown, "SIGINT");
        assert!(shutdown.is_triggered());
    }
}
