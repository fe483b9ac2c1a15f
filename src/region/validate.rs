//! Region Containment Validation
//!
//! Decides whether a requested physical range is claimed by a known
//! region before any read is allowed.
//!
//! # Security Principles
//! - Fail-secure: a range that is not provably contained is refused
//! - Address arithmetic never wraps; an overflowing range matches nothing
//! - Only the top-level sibling chain is consulted

use crate::error::PeekError;
use crate::mm::address::word_span;
use crate::mm::PhysAddr;

use super::resource::{MemoryRegion, RegionNode, RegionTable};

/// Last byte of a `words`-word range starting at `addr`.
///
/// Returns `None` for an empty range or when the range runs past the top
/// of the address space.
#[inline]
pub fn last_byte(addr: PhysAddr, words: usize) -> Option<PhysAddr> {
    let span = word_span(words).filter(|&span| span > 0)?;
    addr.checked_add(span - 1)
}

/// Check whether `region` contains every byte of the requested range.
#[inline]
pub fn region_contains(region: &MemoryRegion, addr: PhysAddr, words: usize) -> bool {
    match last_byte(addr, words) {
        Some(last) => region.start <= addr && last <= region.end,
        None => false,
    }
}

impl RegionTable {
    /// Find the first top-level region that contains the requested range.
    ///
    /// Child regions are not descended into; a range that only a nested
    /// claim covers is still matched through its top-level ancestor.
    pub fn find_containing_region(&self, addr: PhysAddr, words: usize) -> Option<MemoryRegion> {
        self.with_top_level(|roots| find_in(roots, addr, words))
    }

    /// Like [`find_containing_region`](Self::find_containing_region), but
    /// failing with [`PeekError::RegionNotFound`].
    pub fn validate_range(&self, addr: PhysAddr, words: usize) -> Result<MemoryRegion, PeekError> {
        self.find_containing_region(addr, words).ok_or_else(|| {
            log::warn!("no region contains {} word(s) at {}", words, addr);
            PeekError::RegionNotFound {
                address: addr,
                words,
            }
        })
    }
}

fn find_in(roots: &[RegionNode], addr: PhysAddr, words: usize) -> Option<MemoryRegion> {
    roots.iter().map(|node| &node.region).find_map(|region| {
        log::trace!(
            "region {:?}: {}-{} flags={:?}",
            region.label,
            region.start,
            region.end,
            region.flags
        );
        region_contains(region, addr, words).then(|| region.clone())
    })
}
