//! [`NvmStore`]: the public facade tying the codec, layout scanner,
//! appender and garbage collector together. Plays the role `nvm.h`'s
//! four free functions (`nvm_init`/`nvm_read`/`nvm_write`/
//! `nvm_get_error`) play in the original source, and the role
//! `eeprom::EEPROMController` plays for its single-value predecessor.

use crate::config::StoreConfig;

/// Per-block runtime state reconstructed by the layout scanner: where
/// (if anywhere) its freshest valid record lives, and that record's
/// occurrence counter.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BlockState {
    pub(crate) read_pointer: Option<u32>,
    pub(crate) occurrence: u16,
}

/// A mounted, log-structured block store over a flash region.
///
/// * `D` -- the flash driver, anything implementing
///   [`embedded_storage::nor_flash::NorFlash`].
/// * `N` -- number of configured logical blocks.
/// * `BUF` -- size of the RAM staging buffer used to assemble/verify
///   one record at a time; must be at least
///   `config.max_record_len()` (checked in [`NvmStore::mount`]).
///
/// There is no "not yet initialized" state to mismanage: a value of
/// this type only exists once `mount` has already run the boot-time
/// recovery logic, which is the Rust way to express the C API's
/// `bIsInitialized` guard on every call.
pub struct NvmStore<D, const N: usize, const BUF: usize> {
    pub(crate) driver: D,
    pub(crate) config: StoreConfig<N>,
    pub(crate) blocks: [BlockState; N],
    pub(crate) active_page: u32,
    pub(crate) write_pointer: u32,
    pub(crate) error_detected: bool,
    pub(crate) last_boot_recovered: bool,
    pub(crate) gc_in_progress: bool,
    pub(crate) staging: [u8; BUF],
    /// Set when a runtime recovery reset's own erase failed. Once
    /// poisoned, `read`/`write` refuse to touch the driver again --
    /// the closest safe-Rust analogue to the C API's `bIsInitialized`
    /// guard, since this type has no "uninitialized" state to return
    /// to short of a fresh [`NvmStore::mount`].
    pub(crate) poisoned: bool,
}

impl<D, const N: usize, const BUF: usize> NvmStore<D, N, BUF> {
    /// Sticky integrity-error flag. Set by the layout scanner or the
    /// appender whenever a corruption or driver failure forced a region
    /// reset; cleared only by a subsequent successful [`mount`](Self::mount).
    ///
    /// This answers "is something wrong *right now*" -- see
    /// [`last_boot_recovered`](Self::last_boot_recovered) for "was the
    /// state I just booted from dirty".
    pub fn get_error(&self) -> bool {
        self.error_detected
    }

    /// One-shot latch: `true` if `mount` had to discard the prior
    /// on-flash state (torn write, unknown pattern, double-active page,
    /// or a driver failure during the initial scan) to bring the store
    /// up. Unlike the original C `bErrorDetected`, this does not stay
    /// `true` forever after a clean recovery -- `get_error` is cleared
    /// once the recovery succeeds, and this flag is the place the fact
    /// "the previous boot was dirty" is preserved for a caller that
    /// wants to know.
    pub fn last_boot_recovered(&self) -> bool {
        self.last_boot_recovered
    }

    /// The configuration this store was mounted with.
    pub fn config(&self) -> &StoreConfig<N> {
        &self.config
    }

    /// `false` once a runtime recovery reset has itself failed to
    /// erase the region. A poisoned store rejects every further
    /// `read`/`write` without touching the driver; re-mount to recover.
    pub fn is_usable(&self) -> bool {
        !self.poisoned
    }
}
