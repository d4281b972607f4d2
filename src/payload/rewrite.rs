//! Cut-mode injection into print job descriptors.

use std::borrow::Cow;
use std::fmt;

use crate::payload::classify::{classify, ChunkKind};

/// Closing tag of a job descriptor. The directive goes right before it.
pub const CLOSING_MARKER: &[u8] = b"</print>";

/// Line inserted before [`CLOSING_MARKER`].
pub const CUTMODE_DIRECTIVE: &[u8] = b"<cutmode>full</cutmode>\n";

/// Which way a chunk is travelling through a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Print client to printer. The only direction that is ever rewritten.
    ClientToUpstream,
    /// Printer to print client.
    UpstreamToClient,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ClientToUpstream => "client_to_upstream",
            Direction::UpstreamToClient => "upstream_to_client",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prepare a chunk for the opposite leg.
///
/// Printer-bound descriptors get [`CUTMODE_DIRECTIVE`] injected; everything
/// else is returned borrowed and byte-identical. Image chunks are never
/// scanned.
pub fn process(chunk: &[u8], direction: Direction, max_descriptor_size: usize) -> Cow<'_, [u8]> {
    if direction == Direction::UpstreamToClient {
        return Cow::Borrowed(chunk);
    }

    if classify(chunk, max_descriptor_size) == ChunkKind::Image {
        tracing::info!(bytes = chunk.len(), "Image chunk received");
        return Cow::Borrowed(chunk);
    }

    tracing::info!(bytes = chunk.len(), content = %chunk.escape_ascii(), "Descriptor received");

    let rewritten = inject_cutmode(chunk);
    if let Cow::Owned(ref modified) = rewritten {
        tracing::info!(
            bytes = modified.len(),
            content = %modified.escape_ascii(),
            "Descriptor modified"
        );
        crate::observability::metrics::record_rewrite();
    }
    rewritten
}

/// Insert [`CUTMODE_DIRECTIVE`] before the first [`CLOSING_MARKER`].
///
/// Returns the chunk unchanged when the marker is absent. Nothing else in the
/// chunk is inspected.
pub fn inject_cutmode(chunk: &[u8]) -> Cow<'_, [u8]> {
    let Some(pos) = find(chunk, CLOSING_MARKER) else {
        return Cow::Borrowed(chunk);
    };

    let mut out = Vec::with_capacity(chunk.len() + CUTMODE_DIRECTIVE.len());
    out.extend_from_slice(&chunk[..pos]);
    out.extend_from_slice(CUTMODE_DIRECTIVE);
    out.extend_from_slice(&chunk[pos..]);
    Cow::Owned(out)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
