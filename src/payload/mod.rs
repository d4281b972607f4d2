//! Payload inspection subsystem.
//!
//! # Data Flow
//! ```text
//! chunk read from a leg, tagged with its Direction
//!     → printer-bound? no  → forwarded unchanged
//!     → classify.rs: larger than max_descriptor_size → Image, unchanged
//!     → rewrite.rs: Descriptor containing </print>
//!         → <cutmode>full</cutmode>\n inserted before the first </print>
//! ```
//!
//! # Design Decisions
//! - No XML parsing: a literal byte search for the closing marker
//! - Unchanged chunks are returned borrowed, never copied
//! - Each chunk is classified on its own; a descriptor split across reads is
//!   handled per fragment

pub mod classify;
pub mod rewrite;

pub use classify::{classify, ChunkKind};
pub use rewrite::{inject_cutmode, process, Direction, CLOSING_MARKER, CUTMODE_DIRECTIVE};
