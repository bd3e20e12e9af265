//! Input frame decoding.
//!
//! Capture boards emit fixed-size frames: a 20-byte header followed by a
//! subband-major sample payload (`subband_count × samples_per_frame`
//! complex samples). Malformed frames decode to a typed error and are
//! dropped by the capture worker, never propagated.

use bytes::{Buf, BufMut};
use thiserror::Error;

use crate::sample::SAMPLE_BYTES;
use crate::SampleTime;

/// Frame magic, "STFR" little-endian.
pub const FRAME_MAGIC: u32 = 0x5246_5453;

/// Supported frame format version.
pub const FRAME_VERSION: u8 = 1;

/// Header size on the wire.
pub const FRAME_HEADER_BYTES: usize = 20;

/// Decoded frame header.
///
/// Wire layout (little-endian): magic u32, version u8, reserved u8,
/// subband_count u16, samples_per_frame u16, reserved u16, timestamp i64.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Sample time of the first sample in the payload.
    pub timestamp: SampleTime,
    /// Number of subbands carried per frame.
    pub subband_count: u16,
    /// Number of samples per subband per frame.
    pub samples_per_frame: u16,
}

/// Frame decode failure.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Buffer shorter than required.
    #[error("frame truncated: {len} bytes, need {need}")]
    Truncated { len: usize, need: usize },

    /// Magic field mismatch.
    #[error("bad frame magic {found:#010x}")]
    BadMagic { found: u32 },

    /// Unknown format version.
    #[error("unsupported frame version {found}")]
    UnsupportedVersion { found: u8 },

    /// Header shape differs from the configured stream shape.
    #[error(
        "frame shape mismatch: header {subbands}x{samples}, expected {expected_subbands}x{expected_samples}"
    )]
    ShapeMismatch {
        subbands: u16,
        samples: u16,
        expected_subbands: u16,
        expected_samples: u16,
    },
}

impl FrameHeader {
    /// Payload size implied by the header, in bytes.
    #[inline]
    pub fn payload_bytes(&self) -> usize {
        self.subband_count as usize * self.samples_per_frame as usize * SAMPLE_BYTES
    }

    /// Total frame size implied by the header, in bytes.
    #[inline]
    pub fn frame_bytes(&self) -> usize {
        FRAME_HEADER_BYTES + self.payload_bytes()
    }

    /// Decode a header from the start of `buf`.
    pub fn decode(mut buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < FRAME_HEADER_BYTES {
            return Err(DecodeError::Truncated {
                len: buf.len(),
                need: FRAME_HEADER_BYTES,
            });
        }

        let magic = buf.get_u32_le();
        if magic != FRAME_MAGIC {
            return Err(DecodeError::BadMagic { found: magic });
        }
        let version = buf.get_u8();
        if version != FRAME_VERSION {
            return Err(DecodeError::UnsupportedVersion { found: version });
        }
        buf.advance(1); // reserved
        let subband_count = buf.get_u16_le();
        let samples_per_frame = buf.get_u16_le();
        buf.advance(2); // reserved
        let timestamp = SampleTime::new(buf.get_i64_le());

        Ok(Self {
            timestamp,
            subband_count,
            samples_per_frame,
        })
    }

    /// Encode the header (generator sources and tests).
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u32_le(FRAME_MAGIC);
        buf.put_u8(FRAME_VERSION);
        buf.put_u8(0);
        buf.put_u16_le(self.subband_count);
        buf.put_u16_le(self.samples_per_frame);
        buf.put_u16_le(0);
        buf.put_i64_le(self.timestamp.count());
    }
}

/// A validated frame: header plus borrowed payload bytes.
///
/// The payload is subband-major: all samples of subband 0, then subband 1,
/// and so on. Borrowed bytes rather than cast samples, since receive buffers
/// carry no alignment guarantee.
#[derive(Debug)]
pub struct Frame<'a> {
    /// Decoded header.
    pub header: FrameHeader,
    /// Raw payload bytes, exactly `header.payload_bytes()` long.
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Decode and validate a frame against the configured stream shape.
    pub fn decode(
        buf: &'a [u8],
        expected_subbands: u16,
        expected_samples: u16,
    ) -> Result<Self, DecodeError> {
        let header = FrameHeader::decode(buf)?;

        if header.subband_count != expected_subbands || header.samples_per_frame != expected_samples
        {
            return Err(DecodeError::ShapeMismatch {
                subbands: header.subband_count,
                samples: header.samples_per_frame,
                expected_subbands,
                expected_samples,
            });
        }

        let need = header.frame_bytes();
        if buf.len() < need {
            return Err(DecodeError::Truncated {
                len: buf.len(),
                need,
            });
        }

        Ok(Self {
            header,
            payload: &buf[FRAME_HEADER_BYTES..need],
        })
    }

    /// Raw bytes of one subband's samples within the payload.
    pub fn subband_bytes(&self, subband: usize) -> &'a [u8] {
        let stride = self.header.samples_per_frame as usize * SAMPLE_BYTES;
        &self.payload[subband * stride..(subband + 1) * stride]
    }
}
