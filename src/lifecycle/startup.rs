//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the listener before anything else can fail late
//! - Register termination signals
//! - Run until every session has drained
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Returning from `run` is the only way the process exits normally

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::lifecycle::{signals, Shutdown};
use crate::net::Listener;

/// Run the relay until a termination signal arrives and all sessions close.
pub async fn run(config: RelayConfig) -> Result<()> {
    let shutdown = Shutdown::new();
    let listener = Listener::bind(Arc::new(config), shutdown.subscribe()).await?;

    let signal_task = signals::install(shutdown.clone()).map_err(RelayError::Signal)?;

    listener.run().await;
    tracing::info!("Shutdown complete");

    signal_task.abort();
    Ok(())
}
