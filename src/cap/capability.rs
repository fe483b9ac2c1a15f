//! Physical Memory Capabilities
//!
//! A capability is the host's grant of access to one window of physical
//! memory. It is checked at the boundary of every peek, independently of
//! the region table, so a window the host never granted cannot be read
//! even if a region claiming it appears later.
//!
//! # Capability Structure
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  MemoryCapability                        │
//! ├──────────────────────────────────────────────────────────┤
//! │  base: PhysAddr          - First granted address         │
//! │  limit: PhysAddr         - Last granted address          │
//! │  rights: Rights          - Permitted operations          │
//! │  badge: u64              - Identifier of the holder      │
//! └──────────────────────────────────────────────────────────┘
//! ```

use bitflags::bitflags;

use crate::mm::PhysAddr;
use crate::region::last_byte;

bitflags! {
    /// Rights that can be granted by a capability.
    ///
    /// When deriving a capability, rights can only be reduced, never
    /// increased.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Rights: u32 {
        /// Read permission.
        const READ = 1 << 0;
        /// Grant permission (can derive capabilities).
        const GRANT = 1 << 3;
    }
}

/// Host-granted access to a window of physical memory.
///
/// # Security Properties
/// - Only the host constructs root capabilities
/// - Derived capabilities cover a sub-window with a subset of rights
/// - Checks use non-wrapping arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryCapability {
    base: PhysAddr,
    limit: PhysAddr,
    rights: Rights,
    badge: u64,
}

impl MemoryCapability {
    /// Grant access to `[base, limit]`.
    ///
    /// Returns `None` if `limit` lies below `base`.
    pub const fn new(base: PhysAddr, limit: PhysAddr, rights: Rights, badge: u64) -> Option<Self> {
        if limit.as_u64() < base.as_u64() {
            return None;
        }
        Some(Self {
            base,
            limit,
            rights,
            badge,
        })
    }

    /// First granted address.
    #[inline]
    pub const fn base(&self) -> PhysAddr {
        self.base
    }

    /// Last granted address (inclusive).
    #[inline]
    pub const fn limit(&self) -> PhysAddr {
        self.limit
    }

    /// Get the rights granted by this capability.
    #[inline]
    pub const fn rights(&self) -> Rights {
        self.rights
    }

    /// Get the badge.
    #[inline]
    pub const fn badge(&self) -> u64 {
        self.badge
    }

    /// Check if this capability has the specified rights.
    #[inline]
    pub const fn has_rights(&self, required: Rights) -> bool {
        self.rights.contains(required)
    }

    /// Check whether `words` words at `addr` may be accessed with `required`.
    pub fn permits(&self, addr: PhysAddr, words: usize, required: Rights) -> bool {
        if !self.has_rights(required) {
            return false;
        }
        match last_byte(addr, words) {
            Some(last) => self.base <= addr && last <= self.limit,
            None => false,
        }
    }

    /// Derive a capability for a sub-window with reduced rights.
    ///
    /// Returns `None` if:
    /// - This capability doesn't have the GRANT right
    /// - The requested rights exceed current rights
    /// - The requested window is not inside this one
    pub fn derive(
        &self,
        base: PhysAddr,
        limit: PhysAddr,
        rights: Rights,
        badge: u64,
    ) -> Option<Self> {
        if !self.has_rights(Rights::GRANT) || !self.rights.contains(rights) {
            return None;
        }
        if base < self.base || limit > self.limit {
            return None;
        }
        Self::new(base, limit, rights, badge)
    }
}
