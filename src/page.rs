//! Page-header encoding and classification.
//!
//! A page is one flash sector. Its first four bytes carry a header that
//! can only ever move in the direction of more zero bits -- flash can be
//! programmed from `1` to `0` but never back, so "erased" -> "active" ->
//! "stale" is a one-way ratchet per sector, only undone by erasing it.

/// Size, in bytes, of the page header at the start of every sector.
pub const PAGE_HEADER_LEN: usize = 4;

const ERASED: [u8; PAGE_HEADER_LEN] = [0xFF, 0xFF, 0xFF, 0xFF];
const ACTIVE: [u8; PAGE_HEADER_LEN] = [0xAA, 0x55, 0xFF, 0xFF];
const STALE: [u8; PAGE_HEADER_LEN] = [0xAA, 0x55, 0xFF, 0xAA];

/// The role a page is currently playing, decoded from its 4-byte header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PageHeader {
    /// Never written since the last erase (`FF FF FF FF`).
    Erased,
    /// Currently accepting appends (`AA 55 FF FF`).
    Active,
    /// Its live records have all been copied elsewhere; eligible for
    /// erase (`AA 55 FF AA`).
    Stale,
    /// Bytes that don't match any of the three legal encodings -- either
    /// a value this implementation never wrote, or a header caught
    /// mid-transition in an illegal way (a `0` flipped back toward `1`).
    Invalid,
}

/// Classify a page's raw header bytes.
pub fn classify(bytes: &[u8; PAGE_HEADER_LEN]) -> PageHeader {
    match *bytes {
        ERASED => PageHeader::Erased,
        ACTIVE => PageHeader::Active,
        STALE => PageHeader::Stale,
        _ => PageHeader::Invalid,
    }
}

/// Raw bytes to program when transitioning a page into the *active*
/// role. Only ever written over an erased header (all-`0xFF`).
pub const fn active_marker() -> [u8; PAGE_HEADER_LEN] {
    ACTIVE
}

/// Raw bytes to program when transitioning a page from *active* to
/// *stale*. Only the two low bytes actually change (`FF FF` -> `FF AA`);
/// the first two bytes are already `AA 55` and programming them again
/// would be a no-op 1-bit-for-1-bit write, which flash tolerates, but
/// callers only need to touch the bytes that move.
pub const fn stale_marker() -> [u8; PAGE_HEADER_LEN] {
    STALE
}
