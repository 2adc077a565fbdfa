//! Copy-forward garbage collection, run synchronously as part of every
//! page roll (there is no background collector -- §4.6/§9).

use embedded_storage::nor_flash::NorFlash;

use crate::codec::HEADER_LEN;
use crate::error::Error;
use crate::store::NvmStore;

impl<D, const N: usize, const BUF: usize> NvmStore<D, N, BUF>
where
    D: NorFlash,
{
    /// Copy every block still live on `outgoing_page` (other than
    /// `triggering_block`, whose old record is being superseded anyway)
    /// onto the page the write pointer now lives on. Each survivor's
    /// counter is reset to 0 and then the copied record is written with
    /// occurrence 1, mirroring §4.4 ("reset the occurrence counter to 0
    /// ... invoke write") and the original's recursive `nvm_write`
    /// (`nvm.c` resets `occurrenceCntr` to 0, then its own increment
    /// makes the copied record's stored value 1) -- a freshly rolled
    /// page never holds more than one instance of any block, so there is
    /// nothing else for the counter to disambiguate until the next
    /// write, but keeping the on-flash value at 1 rather than 0 keeps
    /// this crate's flash image byte-identical to another conformant
    /// implementation's (§6.4).
    pub(crate) fn garbage_collect(
        &mut self,
        outgoing_page: u32,
        triggering_block: usize,
    ) -> Result<(), Error<D::Error>> {
        self.gc_in_progress = true;
        let outgoing_end = outgoing_page + self.config.sector_size;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "nvm-store: gc starting on outgoing page 0x{:08X}, triggering block {}",
            outgoing_page,
            triggering_block
        );

        for index in 0..N {
            if index == triggering_block {
                continue;
            }
            let live = matches!(
                self.blocks[index].read_pointer,
                Some(p) if p >= outgoing_page && p < outgoing_end
            );
            if !live {
                continue;
            }
            let read_pointer = self.blocks[index].read_pointer.expect("checked live above");

            let size = self.config.blocks[index].size;
            let read_result = {
                let NvmStore { driver, staging, .. } = self;
                driver.read(read_pointer + HEADER_LEN as u32, &mut staging[..size])
            };
            if let Err(e) = read_result {
                self.gc_in_progress = false;
                return Err(Error::Driver(e));
            }

            #[cfg(feature = "defmt")]
            defmt::info!("nvm-store: gc copying block {} forward", index);

            let mut payload = [0u8; BUF];
            payload[..size].copy_from_slice(&self.staging[..size]);
            if let Err(e) = self.append_record(index, 1, &payload[..size]) {
                self.gc_in_progress = false;
                return Err(e);
            }
        }

        #[cfg(feature = "defmt")]
        defmt::info!("nvm-store: gc complete");

        self.gc_in_progress = false;
        Ok(())
    }
}
