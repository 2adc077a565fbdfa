//! In-memory [`NorFlash`] test double.
//!
//! Enforces the one-way "program only clears bits, erase only sets
//! them" discipline with a debug assertion, so a test that accidentally
//! tries to set a bit without erasing first panics instead of silently
//! succeeding -- the same failure mode real NOR flash would mask as a
//! programming error.

use embedded_storage::nor_flash::{ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SimError {
    OutOfBounds,
}

impl NorFlashError for SimError {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            SimError::OutOfBounds => NorFlashErrorKind::OutOfBounds,
        }
    }
}

/// A `SIZE`-byte flash region backed by plain RAM, seeded erased.
pub(crate) struct SimFlash<const SIZE: usize> {
    cells: [u8; SIZE],
    pub(crate) program_calls: usize,
    pub(crate) erase_calls: usize,
}

impl<const SIZE: usize> SimFlash<SIZE> {
    pub(crate) fn new() -> Self {
        SimFlash {
            cells: [0xFF; SIZE],
            program_calls: 0,
            erase_calls: 0,
        }
    }

    /// Force a byte to an arbitrary value, bypassing the program
    /// discipline -- used by tests to simulate bit rot or a torn write
    /// without going through `write`/`erase`.
    #[cfg(test)]
    pub(crate) fn corrupt_byte(&mut self, offset: u32, value: u8) {
        self.cells[offset as usize] = value;
    }
}

impl<const SIZE: usize> ErrorType for SimFlash<SIZE> {
    type Error = SimError;
}

impl<const SIZE: usize> ReadNorFlash for SimFlash<SIZE> {
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let end = start + bytes.len();
        if end > SIZE {
            return Err(SimError::OutOfBounds);
        }
        bytes.copy_from_slice(&self.cells[start..end]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        SIZE
    }
}

impl<const SIZE: usize> NorFlash for SimFlash<SIZE> {
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = 256;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        let start = from as usize;
        let end = to as usize;
        if end > SIZE || start > end {
            return Err(SimError::OutOfBounds);
        }
        self.cells[start..end].fill(0xFF);
        self.erase_calls += 1;
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let start = offset as usize;
        let end = start + bytes.len();
        if end > SIZE {
            return Err(SimError::OutOfBounds);
        }
        for (cell, &new) in self.cells[start..end].iter_mut().zip(bytes) {
            debug_assert_eq!(*cell & new, new, "program would set a bit from 0 back to 1");
            *cell &= new;
        }
        self.program_calls += 1;
        Ok(())
    }
}
