//! Read path (`nvm_read`'s Rust counterpart): fetch a block's freshest
//! recorded value and verify its CRC before handing the payload back.

use embedded_storage::nor_flash::ReadNorFlash;

use crate::codec::{verify, CRC_LEN, HEADER_LEN};
use crate::error::Error;
use crate::store::NvmStore;

impl<D, const N: usize, const BUF: usize> NvmStore<D, N, BUF>
where
    D: ReadNorFlash,
{
    /// Read `block`'s current value into `out`, which must be exactly
    /// the block's configured size. Returns the number of bytes written
    /// to `out` (always the block's configured size) on success, or
    /// [`Error::NotFound`] if the block has never been written since the
    /// region was last reset.
    pub fn read(&mut self, block: usize, out: &mut [u8]) -> Result<usize, Error<D::Error>> {
        if self.poisoned {
            return Err(Error::HardFail);
        }
        if block >= N {
            return Err(Error::BlockIndexOutOfRange);
        }
        let size = self.config.blocks[block].size;
        if out.len() != size {
            return Err(Error::SizeMismatch);
        }
        let addr = self.blocks[block].read_pointer.ok_or(Error::NotFound)?;

        let total = HEADER_LEN + size + CRC_LEN;
        let NvmStore { driver, staging, .. } = self;
        driver.read(addr, &mut staging[..total]).map_err(Error::Driver)?;

        if !verify(&staging[..total], size) {
            return Err(Error::CrcMismatch);
        }
        out.copy_from_slice(&staging[HEADER_LEN..HEADER_LEN + size]);
        Ok(size)
    }
}
