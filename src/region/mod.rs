//! Physical Region Ownership
//!
//! The host's table of claimed physical address ranges and the validator
//! that checks peek requests against it.
//!
//! # Design
//! - [`RegionTable`] is live, shared state owned by the host
//! - Validation takes a read lock, walks the top-level sibling chain and
//!   returns a cloned [`MemoryRegion`]
//! - The table may change between validation and the read that follows;
//!   callers re-validate per word

mod resource;
mod validate;

#[cfg(feature = "std")]
mod iomem;

pub use resource::{MemoryRegion, RegionError, RegionFlags, RegionTable};
pub use validate::{last_byte, region_contains};

#[cfg(feature = "std")]
pub use iomem::{load_iomem, parse_iomem, IomemError, DEFAULT_IOMEM};
