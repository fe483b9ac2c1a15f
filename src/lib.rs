//! mempeek - Region-Validated Physical Memory Inspection
//!
//! Reads raw 32-bit words of physical memory, but only from ranges the
//! host has registered in its memory-region table.
//!
//! # Read Path
//! 1. A configuration string names an address and a word count
//! 2. The whole range is validated against the top-level region table
//! 3. Each word is re-validated, then read through its own transient
//!    single-page mapping that is released before the next word
//!
//! # Security Features
//! - No unsafe code; physical memory is only reached through [`mm::PhysMapper`]
//! - Address arithmetic never wraps
//! - Failed reads never return partial or placeholder data
//! - Optional host-granted capabilities bound every read
//!
//! # Features
//! - `std` (default): `/dev/mem` backend, `/proc/iomem` loader, the
//!   stderr logger and the `mempeek` binary. Without it the crate is
//!   `no_std` + `alloc`.

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod cap;
mod error;
pub mod mm;
pub mod region;
pub mod shell;

#[cfg(feature = "std")]
pub mod logger;

pub use error::PeekError;
pub use mm::{MappingError, PhysAddr, PhysMapper};
pub use region::{MemoryRegion, RegionFlags, RegionTable};
pub use shell::{AdminInterface, ConfigParseError, PeekRequest, PeekResult, PeekService, PeekWord};
