//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, session registry)
//!     → session.rs (printer connect, forwarding loop)
//!         → multiplexer.rs (wait for a readable leg or shutdown)
//!         → payload rewriter (printer-bound chunks only)
//!     → connection.rs (half-close + drain on each leg)
//!
//! Session States:
//!     Establishing → Forwarding → Closing → Closed
//! ```
//!
//! # Design Decisions
//! - One task per session; a session exclusively owns both of its streams
//! - Every wait is cancellable by the shutdown signal
//! - Writes complete before the next read, so at most one chunk per
//!   direction is in flight

pub mod connection;
pub mod listener;
pub mod multiplexer;
pub mod session;

pub use connection::{close_gracefully, Leg, SessionId};
pub use listener::{Listener, ListenerError};
pub use multiplexer::{until_ready, wait_readable, Wait};
pub use session::{CloseReason, Session, SessionState};
