//! Wire codec toward compute workers.
//!
//! Per subband the link carries, in order: a fixed-size begin-work command,
//! one metadata message batching a fixed-size record per contributing input
//! stream, and the raw sample payload. All integers little-endian. Flag
//! ranges are window-local and padded to `max_flag_ranges` slots so every
//! record in a batch has the same size.

use bytes::{Buf, BufMut};
use thiserror::Error;

use contracts::{DelaySample, GapRange, GapSet, MetadataRecord, Sample, SAMPLE_BYTES};

/// Begin-work command magic, "WORK".
pub const COMMAND_MAGIC: u32 = 0x4B52_4F57;
/// Metadata message magic, "META".
pub const METADATA_MAGIC: u32 = 0x4154_454D;
/// Payload message magic, "DATA".
pub const PAYLOAD_MAGIC: u32 = 0x4154_4144;

/// Begin-work command size on the wire.
pub const COMMAND_BYTES: usize = 20;

/// Wire decode failure (tests and diagnostic tooling).
#[derive(Debug, Error)]
pub enum WireError {
    /// Buffer shorter than required.
    #[error("message truncated: {len} bytes, need {need}")]
    Truncated { len: usize, need: usize },

    /// Magic field mismatch.
    #[error("bad message magic {found:#010x}, expected {expected:#010x}")]
    BadMagic { found: u32, expected: u32 },
}

/// Size of one metadata record given the flag-slot count.
pub fn record_bytes(max_flag_ranges: usize) -> usize {
    2 + 2 + 4 + 8 + 8 + max_flag_ranges * 8
}

/// Size of a metadata message for `records` records.
pub fn metadata_bytes(records: usize, max_flag_ranges: usize) -> usize {
    4 + 4 + 2 + 2 + records * record_bytes(max_flag_ranges)
}

/// Size of a payload message for `samples` samples.
pub fn payload_bytes(samples: usize) -> usize {
    4 + 4 + 4 + samples * SAMPLE_BYTES
}

/// Encode the begin-work command.
pub fn encode_begin_work(buf: &mut impl BufMut, period_index: u64, subband: u32, beam: u32) {
    buf.put_u32_le(COMMAND_MAGIC);
    buf.put_u64_le(period_index);
    buf.put_u32_le(subband);
    buf.put_u32_le(beam);
}

/// Encode one metadata message batching `records`.
///
/// Each record's flag set must already be bounded to `max_flag_ranges`;
/// unused slots are zero-filled so records stay fixed-size.
pub fn encode_metadata(
    buf: &mut impl BufMut,
    subband: u32,
    records: &[MetadataRecord],
    max_flag_ranges: usize,
) {
    buf.put_u32_le(METADATA_MAGIC);
    buf.put_u32_le(subband);
    buf.put_u16_le(records.len() as u16);
    buf.put_u16_le(max_flag_ranges as u16);

    for record in records {
        debug_assert!(record.flags.range_count() <= max_flag_ranges);
        buf.put_u16_le(record.stream);
        buf.put_u16_le(record.flags.range_count() as u16);
        buf.put_i32_le(record.alignment_shift as i32);
        buf.put_f64_le(record.delay.fine_begin_seconds);
        buf.put_f64_le(record.delay.fine_end_seconds);
        for slot in 0..max_flag_ranges {
            match record.flags.ranges().get(slot) {
                Some(range) => {
                    buf.put_u32_le(range.begin as u32);
                    buf.put_u32_le(range.end as u32);
                }
                None => {
                    buf.put_u32_le(0);
                    buf.put_u32_le(0);
                }
            }
        }
    }
}

/// Encode one subband payload.
pub fn encode_payload(buf: &mut impl BufMut, subband: u32, samples: &[Sample]) {
    buf.put_u32_le(PAYLOAD_MAGIC);
    buf.put_u32_le(subband);
    buf.put_u32_le(samples.len() as u32);
    buf.put_slice(bytemuck::cast_slice(samples));
}

/// Decoded begin-work command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedCommand {
    pub period_index: u64,
    pub subband: u32,
    pub beam: u32,
}

/// Decoded metadata record.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub stream: u16,
    pub alignment_shift: i64,
    pub delay: DelaySample,
    pub flags: GapSet,
}

fn check(buf: &[u8], need: usize) -> Result<(), WireError> {
    if buf.len() < need {
        return Err(WireError::Truncated {
            len: buf.len(),
            need,
        });
    }
    Ok(())
}

fn check_magic(found: u32, expected: u32) -> Result<(), WireError> {
    if found != expected {
        return Err(WireError::BadMagic { found, expected });
    }
    Ok(())
}

/// Decode a begin-work command, returning the remaining bytes.
pub fn decode_begin_work(buf: &[u8]) -> Result<(DecodedCommand, &[u8]), WireError> {
    check(buf, COMMAND_BYTES)?;
    let mut cursor = buf;
    check_magic(cursor.get_u32_le(), COMMAND_MAGIC)?;
    let command = DecodedCommand {
        period_index: cursor.get_u64_le(),
        subband: cursor.get_u32_le(),
        beam: cursor.get_u32_le(),
    };
    Ok((command, &buf[COMMAND_BYTES..]))
}

/// Decode a metadata message, returning the remaining bytes.
pub fn decode_metadata(buf: &[u8]) -> Result<(u32, Vec<DecodedRecord>, &[u8]), WireError> {
    check(buf, 12)?;
    let mut cursor = buf;
    check_magic(cursor.get_u32_le(), METADATA_MAGIC)?;
    let subband = cursor.get_u32_le();
    let count = cursor.get_u16_le() as usize;
    let max_flag_ranges = cursor.get_u16_le() as usize;

    let total = metadata_bytes(count, max_flag_ranges);
    check(buf, total)?;

    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let stream = cursor.get_u16_le();
        let flag_count = cursor.get_u16_le() as usize;
        let alignment_shift = cursor.get_i32_le() as i64;
        let fine_begin_seconds = cursor.get_f64_le();
        let fine_end_seconds = cursor.get_f64_le();

        let mut flags = GapSet::new();
        for slot in 0..max_flag_ranges {
            let begin = cursor.get_u32_le() as i64;
            let end = cursor.get_u32_le() as i64;
            if slot < flag_count {
                flags.insert(GapRange::new(begin, end));
            }
        }

        records.push(DecodedRecord {
            stream,
            alignment_shift,
            delay: DelaySample {
                coarse_shift: alignment_shift,
                fine_begin_seconds,
                fine_end_seconds,
            },
            flags,
        });
    }

    Ok((subband, records, &buf[total..]))
}

/// Decode a payload message, returning the remaining bytes.
pub fn decode_payload(buf: &[u8]) -> Result<(u32, Vec<Sample>, &[u8]), WireError> {
    check(buf, 12)?;
    let mut cursor = buf;
    check_magic(cursor.get_u32_le(), PAYLOAD_MAGIC)?;
    let subband = cursor.get_u32_le();
    let count = cursor.get_u32_le() as usize;

    let total = payload_bytes(count);
    check(buf, total)?;

    let mut samples = vec![Sample::ZERO; count];
    bytemuck::cast_slice_mut::<Sample, u8>(&mut samples).copy_from_slice(&buf[12..total]);

    Ok((subband, samples, &buf[total..]))
}
