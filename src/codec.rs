//! Record encode/parse/verify -- builds and validates one on-flash record.
//!
//! Layout, contiguous: `pattern (2B LE) | occurrence (2B LE) | payload
//! (size B) | crc32 (4B LE)`. The CRC covers the payload only and uses
//! the parameters fixed by the format (§3): CRC-32/ISO-HDLC, the same
//! algorithm gzip/zlib/PNG use, so that a flash image stays portable
//! across implementations regardless of which CRC library wrote it.

use crc::{Crc, CRC_32_ISO_HDLC};

use crate::config::StoreConfig;

/// Size of a record header: 2-byte pattern + 2-byte occurrence counter.
pub const HEADER_LEN: usize = 4;
/// Size of the CRC-32 trailer.
pub const CRC_LEN: usize = 4;

const CRC: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Compute the record CRC over a payload.
pub fn crc32(payload: &[u8]) -> u32 {
    CRC.checksum(payload)
}

/// What a 4-byte record header tells us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    /// All `0xFF` -- this slot has never been written since the last
    /// erase.
    Empty,
    /// The pattern matches no block in the active [`StoreConfig`]. This
    /// always escalates to a full reset: it means either corruption or
    /// a configuration mismatch with whatever wrote this flash image.
    Unknown,
    /// A known block, with its occurrence counter.
    Block { index: usize, occurrence: u16 },
}

/// Decode a 4-byte record header against a configuration's block table.
pub fn parse_header<const N: usize>(
    header: &[u8; HEADER_LEN],
    config: &StoreConfig<N>,
) -> HeaderKind {
    if *header == [0xFF; HEADER_LEN] {
        return HeaderKind::Empty;
    }
    let pattern = u16::from_le_bytes([header[0], header[1]]);
    let occurrence = u16::from_le_bytes([header[2], header[3]]);
    match config.index_of_pattern(pattern) {
        Some(index) => HeaderKind::Block { index, occurrence },
        None => HeaderKind::Unknown,
    }
}

/// Build a full record (header + payload + CRC) into `buf`. Returns the
/// number of bytes written. `buf` must be at least `HEADER_LEN +
/// payload.len() + CRC_LEN` bytes.
pub fn encode(buf: &mut [u8], pattern: u16, occurrence: u16, payload: &[u8]) -> usize {
    let total = HEADER_LEN + payload.len() + CRC_LEN;
    assert!(buf.len() >= total, "staging buffer too small for this record");

    buf[0..2].copy_from_slice(&pattern.to_le_bytes());
    buf[2..4].copy_from_slice(&occurrence.to_le_bytes());
    buf[HEADER_LEN..HEADER_LEN + payload.len()].copy_from_slice(payload);
    let crc = crc32(payload);
    buf[HEADER_LEN + payload.len()..total].copy_from_slice(&crc.to_le_bytes());
    total
}

/// Verify a full record (`HEADER_LEN + size + CRC_LEN` bytes): recompute
/// the CRC over the payload region and compare to the trailer.
pub fn verify(record: &[u8], size: usize) -> bool {
    if record.len() < HEADER_LEN + size + CRC_LEN {
        return false;
    }
    let payload = &record[HEADER_LEN..HEADER_LEN + size];
    let trailer = &record[HEADER_LEN + size..HEADER_LEN + size + CRC_LEN];
    let existing = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    crc32(payload) == existing
}
