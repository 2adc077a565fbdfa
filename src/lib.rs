//! Log-structured, wear-minimizing block store for raw NOR flash.
//!
//! A fixed table of fixed-size logical blocks is packed into
//! length-prefixed, CRC-32-checked records and appended sequentially
//! across a small rotating set of flash pages (sectors). When the
//! active page fills up, every block still live on it is copied forward
//! onto the next page before the old one is erased -- the same
//! copy-forward scheme [`eeprom`](https://docs.rs/eeprom) uses for a
//! single 16-bit value, generalized to an arbitrary block table and to
//! more than two pages.
//!
//! # Examples
//! ```rust,no_run
//! use nvm_store::{BlockSpec, StoreConfig, NvmStore};
//!
//! const CONFIG: StoreConfig<2> = StoreConfig::new(
//!     [BlockSpec::new(0xCC01, 4), BlockSpec::new(0xAA02, 16)],
//!     0x0800_0000,
//!     1024,
//!     4,
//! );
//!
//! # fn run(flash: impl embedded_storage::nor_flash::NorFlash<Error = core::convert::Infallible>) -> Result<(), nvm_store::Error<core::convert::Infallible>> {
//! let mut store: NvmStore<_, 2, 24> = NvmStore::mount(flash, CONFIG)?;
//! store.write(0, &[1, 2, 3, 4])?;
//! let mut out = [0u8; 4];
//! store.read(0, &mut out)?;
//! assert_eq!(out, [1, 2, 3, 4]);
//! # Ok(())
//! # }
//! ```
//!
//! # Panics
//! [`StoreConfig::new`] panics (at compile time, when called from a
//! `const` item) if the configured blocks do not fit a single sector,
//! or if fewer than two pages are configured. [`NvmStore::mount`]
//! panics if its `BUF` const generic is smaller than the largest
//! configured record.
#![no_std]
#![warn(missing_docs)]

#[cfg(test)]
extern crate std;

mod append;
mod codec;
mod config;
mod error;
mod gc;
mod page;
mod reader;
mod scanner;
mod store;

#[cfg(test)]
mod sim;
#[cfg(test)]
mod tests;

pub use config::{BlockSpec, StoreConfig};
pub use error::Error;
pub use store::NvmStore;
