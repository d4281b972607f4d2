//! Chunk classification.
//!
//! Descriptors and raster data share one byte stream with no framing the
//! relay understands, so the only signal is size: printers receive a short
//! XML descriptor followed by much larger image writes. This is a heuristic
//! and the one place to swap in real content sniffing.

/// What a chunk read from the client is taken to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// Small enough to be an XML job descriptor.
    Descriptor,
    /// Raster/image payload, forwarded untouched.
    Image,
}

/// Classify a chunk by length. A chunk exactly at the threshold is still a
/// descriptor.
pub fn classify(chunk: &[u8], max_descriptor_size: usize) -> ChunkKind {
    if chunk.len() > max_descriptor_size {
        ChunkKind::Image
    } else {
        ChunkKind::Descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive_for_descriptors() {
        assert_eq!(classify(&[0u8; 16], 16), ChunkKind::Descriptor);
        assert_eq!(classify(&[0u8; 17], 16), ChunkKind::Image);
        assert_eq!(classify(&[], 16), ChunkKind::Descriptor);
    }
}
