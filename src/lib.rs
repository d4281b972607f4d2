//! Transparent TCP relay that makes a network label printer always cut.
//!
//! Print clients connect here instead of to the printer. Every byte is
//! forwarded both ways; printer-bound XML job descriptors additionally get
//! `<cutmode>full</cutmode>` injected before `</print>`.

// Core subsystems
pub mod config;
pub mod net;
pub mod payload;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::RelayConfig;
pub use error::RelayError;
pub use lifecycle::Shutdown;
pub use net::Listener;
