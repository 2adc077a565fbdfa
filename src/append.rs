//! Write path (`nvm_write`'s Rust counterpart): dedup, append, and the
//! page-roll machinery that runs when a block's record no longer fits
//! the active page.
//!
//! `write` and `append_record` are kept deliberately separate (§9's
//! "clean re-expression"): `write` owns the caller-facing policy (size
//! checks, dedup, deciding whether a roll is needed), while
//! `append_record` is the bare "build a record and program it" routine
//! that [`crate::gc`] calls directly to copy a block forward without
//! re-running any of that policy.

use embedded_storage::nor_flash::NorFlash;

use crate::codec::{encode, HEADER_LEN};
use crate::error::Error;
use crate::page::{active_marker, stale_marker, PAGE_HEADER_LEN};
use crate::scanner::full_reset;
use crate::store::{BlockState, NvmStore};

impl<D, const N: usize, const BUF: usize> NvmStore<D, N, BUF>
where
    D: NorFlash,
{
    /// Write `payload` to `block`. A no-op if the block's current value
    /// is already identical (dedup-before-write, §4.4) -- the flash is
    /// never touched for a write that wouldn't change anything.
    ///
    /// Any driver failure encountered along the way forces a full
    /// region reset (the same recovery [`NvmStore::mount`] performs) and
    /// is reported as [`Error::RegionReset`] if that reset succeeds, or
    /// [`Error::HardFail`] -- poisoning the store -- if it doesn't.
    pub fn write(&mut self, block: usize, payload: &[u8]) -> Result<(), Error<D::Error>> {
        if self.poisoned {
            return Err(Error::HardFail);
        }
        if block >= N {
            return Err(Error::BlockIndexOutOfRange);
        }
        if payload.len() != self.config.blocks[block].size {
            return Err(Error::SizeMismatch);
        }

        match self.try_write(block, payload) {
            Ok(()) => Ok(()),
            Err(Error::Driver(e)) => self.runtime_reset(e),
            Err(e) => Err(e),
        }
    }

    fn try_write(&mut self, block: usize, payload: &[u8]) -> Result<(), Error<D::Error>> {
        if self.current_matches(block, payload)? {
            return Ok(());
        }

        let record_len = self.config.blocks[block].record_len() as u32;
        let would_overflow = self.blocks[block].occurrence == u16::MAX;
        let out_of_room = self.write_pointer + record_len > self.page_end();

        if would_overflow || out_of_room {
            self.roll_page(block)?;
        }

        let occurrence = self.blocks[block].occurrence.wrapping_add(1);
        self.append_record(block, occurrence, payload)
    }

    /// Whether `block`'s currently-recorded value already equals
    /// `payload`, reading it back from flash if a read pointer exists.
    fn current_matches(&mut self, block: usize, payload: &[u8]) -> Result<bool, Error<D::Error>> {
        let Some(read_pointer) = self.blocks[block].read_pointer else {
            return Ok(false);
        };
        let size = self.config.blocks[block].size;
        let NvmStore { driver, staging, .. } = self;
        driver
            .read(read_pointer + HEADER_LEN as u32, &mut staging[..size])
            .map_err(Error::Driver)?;
        Ok(&staging[..size] == payload)
    }

    /// Program one record at the current write pointer and advance it.
    /// Pure append: no dedup, no roll, no occurrence bookkeeping beyond
    /// recording the value it's given. Shared by `write` and
    /// [`crate::gc`]'s copy-forward loop.
    pub(crate) fn append_record(
        &mut self,
        block: usize,
        occurrence: u16,
        payload: &[u8],
    ) -> Result<(), Error<D::Error>> {
        let pattern = self.config.blocks[block].pattern;
        let addr = self.write_pointer;

        let len = {
            let NvmStore { driver, staging, .. } = self;
            let len = encode(staging, pattern, occurrence, payload);
            driver.write(addr, &staging[..len]).map_err(Error::Driver)?;
            len
        };

        self.write_pointer = addr + len as u32;
        self.blocks[block].read_pointer = Some(addr);
        self.blocks[block].occurrence = occurrence;
        Ok(())
    }

    /// End address (exclusive) of the current active page.
    ///
    /// Tracked via the explicit `active_page` index rather than derived
    /// from `write_pointer / sector_size`: the latter misclassifies the
    /// page the instant `write_pointer` lands exactly on a sector
    /// boundary (the scenario §4.3 step 4's "boundary quirk" papers
    /// over in the original C by rewinding the pointer by half a
    /// header). Tracking the page explicitly -- the `(page_index,
    /// offset)` pairing the design notes recommend over raw address
    /// arithmetic -- removes the ambiguity outright instead of
    /// special-casing the one address value that triggers it.
    fn page_end(&self) -> u32 {
        self.config.page_address(self.active_page) + self.config.sector_size
    }

    /// Roll to the next page: erase it, mark it active, copy every
    /// still-live block other than `triggering_block` forward via GC,
    /// then mark the outgoing page stale. `triggering_block`'s own prior
    /// record is deliberately left behind uncopied -- it is about to be
    /// superseded by the write that forced this roll.
    ///
    /// Pages rotate round-robin across all `config.page_count` pages
    /// rather than just swapping between two, generalizing the original
    /// two-page design for basic wear leveling (§9 design note).
    fn roll_page(&mut self, triggering_block: usize) -> Result<(), Error<D::Error>> {
        let outgoing_index = self.active_page;
        let outgoing_addr = self.config.page_address(outgoing_index);
        let incoming_index = (outgoing_index + 1) % self.config.page_count;
        let incoming_addr = self.config.page_address(incoming_index);

        #[cfg(feature = "defmt")]
        defmt::info!(
            "nvm-store: rolling page {} -> {}, triggered by block {}",
            outgoing_index,
            incoming_index,
            triggering_block
        );

        self.driver
            .erase(incoming_addr, incoming_addr + self.config.sector_size)
            .map_err(Error::Driver)?;
        self.driver
            .write(incoming_addr, &active_marker())
            .map_err(Error::Driver)?;
        self.write_pointer = incoming_addr + PAGE_HEADER_LEN as u32;
        self.active_page = incoming_index;

        self.garbage_collect(outgoing_addr, triggering_block)?;

        // Only the low two bytes of the header actually move (the high
        // two, `AA 55`, are already there from `active_marker`).
        self.driver
            .write(outgoing_addr + 2, &stale_marker()[2..4])
            .map_err(Error::Driver)?;

        self.blocks[triggering_block].occurrence = 0;
        Ok(())
    }

    /// Recovery path for a driver failure encountered mid-write: reset
    /// the whole region the same way [`NvmStore::mount`] would on a
    /// torn boot. On success the store remains usable but every block's
    /// prior value, including the one being written, is gone. On
    /// failure the store is poisoned and every further call is refused
    /// without touching the driver again.
    fn runtime_reset(&mut self, _cause: D::Error) -> Result<(), Error<D::Error>> {
        #[cfg(feature = "defmt")]
        defmt::error!("nvm-store: driver failure mid-write, forcing a runtime region reset");

        match full_reset(&mut self.driver, &self.config) {
            Ok(write_pointer) => {
                self.blocks = [BlockState::default(); N];
                self.active_page = 0;
                self.write_pointer = write_pointer;
                self.error_detected = true;
                Err(Error::RegionReset)
            }
            Err(_) => {
                self.poisoned = true;
                Err(Error::HardFail)
            }
        }
    }
}
