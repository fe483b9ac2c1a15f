//! Physical Address Types
//!
//! Type-safe wrapper for physical memory addresses.
//!
//! # Security Properties
//! - Physical addresses cannot be dereferenced directly
//! - Arithmetic that could wrap the address width is checked
//! - Page frame and offset decomposition is explicit

use core::fmt;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;
/// Page size mask
pub const PAGE_MASK: u64 = PAGE_SIZE as u64 - 1;
/// Bits to shift for page number
pub const PAGE_SHIFT: u32 = 12;

/// Size of one peeked word in bytes.
pub const WORD_SIZE: usize = 4;

/// A physical memory address.
///
/// This is a newtype wrapper that keeps physical addresses apart from
/// plain integers. A physical address is never turned into a pointer;
/// it has to go through a [`PhysMapper`](super::PhysMapper) first.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct PhysAddr(u64);

impl PhysAddr {
    /// The highest representable physical address.
    pub const MAX: Self = Self(u64::MAX);

    /// Create a new physical address.
    #[inline]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Check if the address is page-aligned.
    #[inline]
    pub const fn is_aligned(self) -> bool {
        self.0 & PAGE_MASK == 0
    }

    /// Align the address down to the nearest page boundary.
    #[inline]
    pub const fn align_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// Get the page frame number.
    #[inline]
    pub const fn page_frame_number(self) -> u64 {
        self.0 >> PAGE_SHIFT
    }

    /// Create from a page frame number.
    ///
    /// Returns `None` if the frame lies beyond the address width.
    #[inline]
    pub const fn from_page_frame_number(pfn: u64) -> Option<Self> {
        if pfn > (u64::MAX >> PAGE_SHIFT) {
            return None;
        }
        Some(Self(pfn << PAGE_SHIFT))
    }

    /// Get the offset within the containing page.
    #[inline]
    pub const fn page_offset(self) -> usize {
        (self.0 & PAGE_MASK) as usize
    }

    /// Add an offset to this address, failing instead of wrapping.
    #[inline]
    pub const fn checked_add(self, offset: u64) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }
}

impl From<u64> for PhysAddr {
    fn from(addr: u64) -> Self {
        Self(addr)
    }
}

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr({:#018x})", self.0)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl fmt::LowerHex for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Number of bytes covered by `words` peeked words.
///
/// Returns `None` if the byte count does not fit the address width.
#[inline]
pub fn word_span(words: usize) -> Option<u64> {
    u64::try_from(words).ok()?.checked_mul(WORD_SIZE as u64)
}
