//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Bind listener → Install signal handlers → Accept
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Listener stops accepting → Sessions drain → run() returns → exit 0
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then listener, then signals
//! - Ordered shutdown: stop accept, drain, close
//! - Signal handling never blocks; the coordinator does the waiting

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
