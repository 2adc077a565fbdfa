//! Boot-time layout scan (`mount`, the Rust name for `nvm_init`).
//!
//! Finds the active page, reconstructs every configured block's read
//! pointer and occurrence counter, and falls back to a full region
//! reset the moment anything looks inconsistent -- a torn write, an
//! unrecognized pattern, two pages both claiming to be active, or the
//! flash driver itself bouncing a read.

use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};

use crate::codec::{parse_header, verify, HeaderKind, CRC_LEN, HEADER_LEN};
use crate::config::StoreConfig;
use crate::error::Error;
use crate::page::{active_marker, classify, PageHeader, PAGE_HEADER_LEN};
use crate::store::{BlockState, NvmStore};

impl<D, const N: usize, const BUF: usize> NvmStore<D, N, BUF>
where
    D: NorFlash,
{
    /// Mount the store: find (or create) the active page, reconstruct
    /// read pointers, and recover from any corruption found along the
    /// way. See the module docs and §4.2 of the design for the full
    /// state machine.
    ///
    /// `BUF` must be at least `config.max_record_len()` -- this is
    /// asserted at mount time since it cannot be checked purely from
    /// `StoreConfig::new`'s const-eval context (it is a property of the
    /// pairing of `N` and `BUF`, chosen independently by the caller).
    pub fn mount(mut driver: D, config: StoreConfig<N>) -> Result<Self, Error<D::Error>> {
        assert!(
            BUF >= config.max_record_len(),
            "staging buffer is smaller than the largest configured record"
        );

        let mut staging = [0u8; BUF];
        let mut blocks = [BlockState::default(); N];

        let (active_page, fault) = scan_active_page(&mut driver, &config);

        let (active_page_index, write_pointer, last_boot_recovered) = if fault {
            (0, full_reset(&mut driver, &config)?, true)
        } else if let Some(page_addr) = active_page {
            match scan_active_contents(&mut driver, &mut blocks, &config, page_addr, &mut staging)
            {
                Some(wp) => (config.page_of(page_addr), wp, false),
                None => {
                    blocks = [BlockState::default(); N];
                    (0, full_reset(&mut driver, &config)?, true)
                }
            }
        } else {
            (0, full_reset(&mut driver, &config)?, false)
        };

        Ok(NvmStore {
            driver,
            config,
            blocks,
            active_page: active_page_index,
            write_pointer,
            error_detected: false,
            last_boot_recovered,
            gc_in_progress: false,
            staging,
            poisoned: false,
        })
    }
}

/// Find the unique *active* page, if any. Returns `fault = true` if more
/// than one page claims to be active, if any page header is neither
/// erased, active nor stale, or if reading a header failed -- all three
/// escalate to a full reset rather than guessing.
fn scan_active_page<D, const N: usize>(driver: &mut D, config: &StoreConfig<N>) -> (Option<u32>, bool)
where
    D: ReadNorFlash,
{
    let mut active = None;
    let mut fault = false;
    for page in 0..config.page_count {
        let addr = config.page_address(page);
        let mut header = [0u8; PAGE_HEADER_LEN];
        if driver.read(addr, &mut header).is_err() {
            fault = true;
            continue;
        }
        match classify(&header) {
            PageHeader::Active => {
                if active.is_some() {
                    fault = true;
                }
                active = Some(addr);
            }
            PageHeader::Invalid => fault = true,
            PageHeader::Erased | PageHeader::Stale => {}
        }
    }
    (active, fault)
}

/// Erase every configured page and mark page 0 active. Returns the
/// write pointer for a freshly reset region (just past page 0's
/// header). Shared by [`NvmStore::mount`] and the runtime recovery path
/// in `append` -- both need exactly the same "nuke it and start over on
/// page 0" recovery, which the original C's write-failure branch almost
/// but didn't quite do (it reset the write pointer without ever marking
/// page 0 active again).
pub(crate) fn full_reset<D, const N: usize>(
    driver: &mut D,
    config: &StoreConfig<N>,
) -> Result<u32, Error<D::Error>>
where
    D: NorFlash,
{
    #[cfg(feature = "defmt")]
    defmt::warn!(
        "nvm-store: full reset, erasing {} page(s) from 0x{:08X}",
        config.page_count,
        config.region_start
    );

    for page in 0..config.page_count {
        let addr = config.page_address(page);
        driver
            .erase(addr, addr + config.sector_size)
            .map_err(|_| Error::HardFail)?;
    }
    let base = config.page_address(0);
    driver.write(base, &active_marker()).map_err(|_| Error::HardFail)?;

    #[cfg(feature = "defmt")]
    defmt::info!("nvm-store: full reset complete, page 0 active");

    Ok(base + PAGE_HEADER_LEN as u32)
}

/// Walk the active page twice: once to find the tentative write
/// pointer while validating every record's pattern and CRC, once more
/// (only if the tail past the write pointer is confirmed erased) to
/// assign each block's read pointer to its highest-occurrence valid
/// instance. Returns `None` the moment anything looks wrong, signaling
/// the caller to fall back to a full reset.
fn scan_active_contents<D, const N: usize>(
    driver: &mut D,
    blocks: &mut [BlockState; N],
    config: &StoreConfig<N>,
    page_addr: u32,
    staging: &mut [u8],
) -> Option<u32>
where
    D: ReadNorFlash,
{
    let page_end = page_addr + config.sector_size;

    let write_pointer = {
        let mut addr = page_addr + PAGE_HEADER_LEN as u32;
        loop {
            if addr >= page_end {
                break addr;
            }
            let mut header = [0u8; HEADER_LEN];
            driver.read(addr, &mut header).ok()?;
            match parse_header(&header, config) {
                HeaderKind::Empty => break addr,
                HeaderKind::Unknown => return None,
                HeaderKind::Block { index, .. } => {
                    if !verify_record_at(driver, addr, config.blocks[index].size, staging) {
                        return None;
                    }
                    addr += config.blocks[index].record_len() as u32;
                }
            }
        }
    };

    if !region_is_erased(driver, write_pointer, page_end, staging) {
        return None;
    }

    let mut addr = page_addr + PAGE_HEADER_LEN as u32;
    while addr < write_pointer {
        let mut header = [0u8; HEADER_LEN];
        driver.read(addr, &mut header).ok()?;
        match parse_header(&header, config) {
            HeaderKind::Empty => break,
            HeaderKind::Unknown => return None,
            HeaderKind::Block { index, occurrence } => {
                if !verify_record_at(driver, addr, config.blocks[index].size, staging) {
                    return None;
                }
                let state = &mut blocks[index];
                if state.read_pointer.is_none() || occurrence > state.occurrence {
                    state.read_pointer = Some(addr);
                    state.occurrence = occurrence;
                }
                addr += config.blocks[index].record_len() as u32;
            }
        }
    }

    Some(write_pointer)
}

fn verify_record_at<D: ReadNorFlash>(driver: &mut D, addr: u32, size: usize, staging: &mut [u8]) -> bool {
    let total = HEADER_LEN + size + CRC_LEN;
    if driver.read(addr, &mut staging[..total]).is_err() {
        return false;
    }
    verify(&staging[..total], size)
}

/// Invariant 5: everything between the write pointer and the page end
/// must still read as erased (`0xFF`). A non-erased tail means a torn
/// write interrupted a previous append.
fn region_is_erased<D: ReadNorFlash>(driver: &mut D, mut start: u32, end: u32, staging: &mut [u8]) -> bool {
    while start < end {
        let chunk = core::cmp::min(staging.len(), (end - start) as usize);
        if driver.read(start, &mut staging[..chunk]).is_err() {
            return false;
        }
        if staging[..chunk].iter().any(|&b| b != 0xFF) {
            return false;
        }
        start += chunk as u32;
    }
    true
}
