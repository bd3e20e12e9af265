//! Complex sample type shared by capture and dispatch.

use bytemuck::{Pod, Zeroable};

/// One complex voltage sample: 16-bit signed real and imaginary parts.
///
/// `Pod` so frame payloads and arena regions convert to and from raw bytes
/// by cast instead of per-element parsing. Wire byte order is little-endian,
/// matching the in-memory layout on supported hosts.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Sample {
    /// Real part.
    pub re: i16,
    /// Imaginary part.
    pub im: i16,
}

/// Size of one sample on the wire and in memory.
pub const SAMPLE_BYTES: usize = std::mem::size_of::<Sample>();

impl Sample {
    /// The zero sample, used to blank gapped positions.
    pub const ZERO: Sample = Sample { re: 0, im: 0 };

    /// Create a sample from its parts.
    #[inline]
    pub const fn new(re: i16, im: i16) -> Self {
        Self { re, im }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(SAMPLE_BYTES, 4);
        let samples = [Sample::new(1, -2), Sample::new(3, 4)];
        let bytes: &[u8] = bytemuck::cast_slice(&samples);
        assert_eq!(bytes.len(), 8);
        let back: &[Sample] = bytemuck::cast_slice(bytes);
        assert_eq!(back, &samples);
    }
}
