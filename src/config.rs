//! Compile-time configuration table: which logical blocks exist, how big
//! they are and where the region they live in sits on the flash part.
//!
//! Mirrors `NvmBlocks[eNvmBlockCount]` / `nvm_cfg.h` from the original
//! source: a fixed table of `(pattern, size)` pairs, known entirely at
//! build time.

use crate::codec::{CRC_LEN, HEADER_LEN};
use crate::page::PAGE_HEADER_LEN;

/// One logical block's compile-time schema: a unique pattern used to
/// recognize its records on flash, and its fixed payload size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlockSpec {
    /// 16-bit pattern stored in every record's header for this block.
    /// Must be unique among all configured blocks.
    pub pattern: u16,
    /// Fixed payload size, in bytes, for this block.
    pub size: usize,
}

impl BlockSpec {
    /// Declare a logical block. `pattern` must be unique within a
    /// [`StoreConfig`]; `size` is the block's fixed payload size.
    pub const fn new(pattern: u16, size: usize) -> Self {
        BlockSpec { pattern, size }
    }

    /// Total on-flash footprint of one instance of this block:
    /// header + payload + CRC trailer.
    pub const fn record_len(&self) -> usize {
        HEADER_LEN + self.size + CRC_LEN
    }
}

/// Static description of the store's region layout and block table.
///
/// `N` is the number of configured logical blocks -- the const-generic
/// equivalent of `eNvmBlockCount` in the original configuration table.
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig<const N: usize> {
    pub(crate) blocks: [BlockSpec; N],
    pub(crate) region_start: u32,
    pub(crate) sector_size: u32,
    pub(crate) page_count: u32,
}

impl<const N: usize> StoreConfig<N> {
    /// Build a store configuration.
    ///
    /// `region_start`/`sector_size` describe the flash region
    /// `[region_start, region_start + sector_size * page_count)`; it must
    /// be sector-aligned and cover at least two sectors (§6.4). Patterns
    /// must be pairwise distinct.
    ///
    /// Call this from a `const` item (`const CONFIG: StoreConfig<N> =
    /// StoreConfig::new(...)`) to get the static capacity check --
    /// "the sum of `BLOCK_HEADER + size(b) + CRC` over all configured
    /// blocks must be strictly less than `SECTOR_SIZE - PAGE_HEADER`"
    /// (§9) -- evaluated at compile time instead of discovered on a
    /// device during the first garbage collection.
    pub const fn new(
        blocks: [BlockSpec; N],
        region_start: u32,
        sector_size: u32,
        page_count: u32,
    ) -> Self {
        assert!(page_count >= 2, "a store needs at least two pages to rotate across");
        assert!(sector_size > PAGE_HEADER_LEN as u32, "sector_size must exceed the page header");

        let mut total: u32 = 0;
        let mut i = 0;
        while i < N {
            assert!(blocks[i].size > 0, "a logical block's size must be non-zero");
            total += blocks[i].record_len() as u32;
            i += 1;
        }
        assert!(
            total < sector_size - PAGE_HEADER_LEN as u32,
            "configured blocks do not fit a single sector net of header overhead; GC could never complete a roll"
        );

        StoreConfig {
            blocks,
            region_start,
            sector_size,
            page_count,
        }
    }

    /// Number of configured logical blocks.
    pub const fn len(&self) -> usize {
        N
    }

    /// Whether this configuration has no blocks (always `false` for any
    /// `N > 0`; kept for API symmetry with collection types).
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Look up a block's index by its on-flash pattern.
    pub(crate) fn index_of_pattern(&self, pattern: u16) -> Option<usize> {
        self.blocks.iter().position(|b| b.pattern == pattern)
    }

    /// Address of the first byte of page `page` (0-indexed).
    pub(crate) fn page_address(&self, page: u32) -> u32 {
        self.region_start + page * self.sector_size
    }

    /// The page index (0-indexed) address `addr` falls within.
    pub(crate) fn page_of(&self, addr: u32) -> u32 {
        (addr - self.region_start) / self.sector_size
    }

    /// One past the last valid address in the region.
    pub(crate) fn region_end(&self) -> u32 {
        self.region_start + self.sector_size * self.page_count
    }

    /// The largest single record (header + payload + CRC) this
    /// configuration can produce. Used to size the caller-provided
    /// staging buffer.
    pub const fn max_record_len(&self) -> usize {
        let mut max = 0;
        let mut i = 0;
        while i < N {
            let len = self.blocks[i].record_len();
            if len > max {
                max = len;
            }
            i += 1;
        }
        max
    }
}
