use embedded_storage::nor_flash::{NorFlashError, NorFlashErrorKind};

/// Errors returned by [`crate::NvmStore`] operations.
///
/// Every failure mode the store can hit -- a driver bounce, a corrupt
/// record, a caller mistake -- is represented here instead of being
/// compressed into a single boolean, the way `eeprom::FlashResult` already
/// does for the single-value predecessor of this store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error<E> {
    /// The underlying flash driver reported a failure (read, program or
    /// erase). Carries the driver's own error type.
    Driver(E),
    /// A record's CRC-32 trailer did not match its payload. Returned by
    /// `read`; internally, the same condition found during boot-time
    /// scanning instead escalates straight to a full reset (§4.2).
    CrcMismatch,
    /// `write` was called with a payload whose length does not match
    /// the block's configured size. Caller error: flash is untouched.
    SizeMismatch,
    /// `block` is not a valid index into the store's configuration.
    /// Caller error: flash is untouched.
    BlockIndexOutOfRange,
    /// The block is configured but has never been written (no read
    /// pointer set yet).
    NotFound,
    /// The requested operation could not be completed and forced a full
    /// region reset (corruption or a driver bounce mid-write). The
    /// reset itself succeeded, so the store remains usable, but every
    /// block's prior data -- including the one being written -- is
    /// gone; the caller should retry the write.
    RegionReset,
    /// The region was found to be inconsistent and the recovery erase
    /// itself failed. The store is left unusable until re-mounted.
    HardFail,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::Driver(e)
    }
}

impl<E: NorFlashError> Error<E> {
    /// Classify this error the way `embedded-storage` classifies raw
    /// driver errors, for callers that only care about broad buckets.
    pub fn kind(&self) -> NorFlashErrorKind {
        match self {
            Error::Driver(e) => e.kind(),
            Error::SizeMismatch | Error::BlockIndexOutOfRange => NorFlashErrorKind::OutOfBounds,
            Error::CrcMismatch | Error::NotFound | Error::RegionReset | Error::HardFail => {
                NorFlashErrorKind::Other
            }
        }
    }
}
