//! Error types for process-level failures.
//!
//! Everything that goes wrong inside a session stays inside the session;
//! these are the failures that stop the relay from starting at all.

use thiserror::Error;

use crate::config::ConfigError;
use crate::net::listener::ListenerError;

/// Main error type for the relay process.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The accepting socket could not be set up.
    #[error("Listener error: {0}")]
    Listener(#[from] ListenerError),

    /// Termination signal handlers could not be registered.
    #[error("Failed to register signal handlers: {0}")]
    Signal(#[source] std::io::Error),
}

/// Result type alias for RelayError
pub type Result<T> = std::result::Result<T, RelayError>;
