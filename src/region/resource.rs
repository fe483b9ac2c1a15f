//! Host Region Table
//!
//! A tree of claimed physical address ranges, as kept by the host's
//! resource manager. Top-level regions form a sibling chain ordered by
//! start address; each region may own nested child claims.
//!
//! # Design
//! - The tree lives behind a reader/writer spinlock
//! - Claims and releases are the only mutations
//! - Readers get cloned [`MemoryRegion`] snapshots, never references

use alloc::string::String;
use alloc::vec::Vec;

use bitflags::bitflags;
use spin::RwLock;

use crate::mm::PhysAddr;

bitflags! {
    /// Region semantics, using the host resource manager's bit values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RegionFlags: u32 {
        /// Port I/O space.
        const IO = 0x0000_0100;
        /// Memory-mapped space.
        const MEM = 0x0000_0200;
        /// Prefetchable memory.
        const PREFETCH = 0x0000_2000;
        /// Read-only memory.
        const READONLY = 0x0000_4000;
        /// Cacheable memory.
        const CACHEABLE = 0x0000_8000;
        /// System RAM.
        const SYSRAM = 0x0100_0000;
        /// Userland may not map the region.
        const EXCLUSIVE = 0x0800_0000;
        /// Region is disabled.
        const DISABLED = 0x1000_0000;
        /// Address not yet assigned.
        const UNSET = 0x2000_0000;
        /// Driver has claimed the region.
        const BUSY = 0x8000_0000;
    }
}

/// One claimed physical address range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    /// First address of the region.
    pub start: PhysAddr,
    /// Last address of the region (inclusive).
    pub end: PhysAddr,
    /// Human-readable owner label.
    pub label: String,
    /// Region semantics.
    pub flags: RegionFlags,
}

impl MemoryRegion {
    /// Create a region descriptor.
    ///
    /// Returns `None` if `end` lies below `start`.
    pub fn new(
        start: PhysAddr,
        end: PhysAddr,
        label: impl Into<String>,
        flags: RegionFlags,
    ) -> Option<Self> {
        if end < start {
            return None;
        }
        Some(Self {
            start,
            end,
            label: label.into(),
            flags,
        })
    }

    /// Check whether `other` lies entirely inside this region.
    #[inline]
    pub fn encloses(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check whether the two regions share at least one address.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Error type for region table operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    /// The end address lies below the start address.
    #[error("invalid region {start}-{end}")]
    InvalidRange {
        /// Requested start.
        start: PhysAddr,
        /// Requested end.
        end: PhysAddr,
    },
    /// The claim partially overlaps an existing region.
    #[error("region conflicts with existing claim {existing:?}")]
    Conflict {
        /// Label of the region in the way.
        existing: String,
    },
    /// No region with these exact bounds is registered.
    #[error("no region registered at {start}-{end}")]
    NotFound {
        /// Requested start.
        start: PhysAddr,
        /// Requested end.
        end: PhysAddr,
    },
}

/// A region together with its nested claims.
#[derive(Debug, Clone)]
pub(crate) struct RegionNode {
    pub(crate) region: MemoryRegion,
    pub(crate) children: Vec<RegionNode>,
}

impl RegionNode {
    pub(crate) fn new(region: MemoryRegion) -> Self {
        Self {
            region,
            children: Vec::new(),
        }
    }
}

/// Where a new claim goes relative to one existing sibling.
enum Placement {
    Disjoint,
    Inside,
    Adopts,
    Conflict,
}

fn place(existing: &MemoryRegion, claim: &MemoryRegion) -> Placement {
    if !existing.overlaps(claim) {
        Placement::Disjoint
    } else if existing.encloses(claim) {
        Placement::Inside
    } else if claim.encloses(existing) {
        Placement::Adopts
    } else {
        Placement::Conflict
    }
}

/// Insert `claim` into one level of the tree.
fn insert(level: &mut Vec<RegionNode>, claim: MemoryRegion) -> Result<(), RegionError> {
    let mut adopted = Vec::new();
    let mut parent = None;
    for (idx, node) in level.iter().enumerate() {
        match place(&node.region, &claim) {
            Placement::Disjoint => {}
            Placement::Inside => {
                parent = Some(idx);
                break;
            }
            Placement::Adopts => adopted.push(idx),
            Placement::Conflict => {
                return Err(RegionError::Conflict {
                    existing: node.region.label.clone(),
                })
            }
        }
    }

    if let Some(idx) = parent {
        return insert(&mut level[idx].children, claim);
    }

    let mut node = RegionNode::new(claim);
    for idx in adopted.into_iter().rev() {
        node.children.push(level.remove(idx));
    }
    node.children.sort_by_key(|child| child.region.start);

    let at = level.partition_point(|sibling| sibling.region.start < node.region.start);
    level.insert(at, node);
    Ok(())
}

/// Remove the region with exactly these bounds, promoting its children.
fn remove(
    level: &mut Vec<RegionNode>,
    start: PhysAddr,
    end: PhysAddr,
) -> Option<MemoryRegion> {
    if let Some(idx) = level
        .iter()
        .position(|node| node.region.start == start && node.region.end == end)
    {
        let node = level.remove(idx);
        for child in node.children {
            let at = level.partition_point(|sibling| sibling.region.start < child.region.start);
            level.insert(at, child);
        }
        return Some(node.region);
    }

    level
        .iter_mut()
        .filter(|node| node.region.start <= start && end <= node.region.end)
        .find_map(|node| remove(&mut node.children, start, end))
}

fn flatten(level: &[RegionNode], depth: usize, out: &mut Vec<(usize, MemoryRegion)>) {
    for node in level {
        out.push((depth, node.region.clone()));
        flatten(&node.children, depth + 1, out);
    }
}

/// The live table of claimed physical regions.
///
/// The table is shared between the host, which claims and releases
/// regions at any time, and the validator, which only reads it.
#[derive(Debug, Default)]
pub struct RegionTable {
    roots: RwLock<Vec<RegionNode>>,
}

impl RegionTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            roots: RwLock::new(Vec::new()),
        }
    }

    /// Build a table from an already nested tree.
    #[cfg(feature = "std")]
    pub(crate) fn from_nodes(roots: Vec<RegionNode>) -> Self {
        Self {
            roots: RwLock::new(roots),
        }
    }

    /// Claim a physical range.
    ///
    /// A claim inside an existing region becomes its child; a claim that
    /// encloses existing siblings adopts them. Partial overlaps are refused.
    pub fn request_region(
        &self,
        start: PhysAddr,
        end: PhysAddr,
        label: &str,
        flags: RegionFlags,
    ) -> Result<(), RegionError> {
        let claim = MemoryRegion::new(start, end, label, flags)
            .ok_or(RegionError::InvalidRange { start, end })?;

        insert(&mut self.roots.write(), claim)?;
        log::debug!("claimed {}-{} {:?}", start, end, label);
        Ok(())
    }

    /// Release the region with exactly these bounds.
    ///
    /// Its children take its place in the parent's sibling chain.
    pub fn release_region(
        &self,
        start: PhysAddr,
        end: PhysAddr,
    ) -> Result<MemoryRegion, RegionError> {
        let region = remove(&mut self.roots.write(), start, end)
            .ok_or(RegionError::NotFound { start, end })?;
        log::debug!("released {}-{} {:?}", start, end, region.label);
        Ok(region)
    }

    /// Snapshot of the top-level sibling chain.
    pub fn top_level(&self) -> Vec<MemoryRegion> {
        self.roots
            .read()
            .iter()
            .map(|node| node.region.clone())
            .collect()
    }

    /// Snapshot of the whole tree in pre-order, with nesting depth.
    pub fn snapshot(&self) -> Vec<(usize, MemoryRegion)> {
        let mut out = Vec::new();
        flatten(&self.roots.read(), 0, &mut out);
        out
    }

    /// Run `f` over the top-level regions while holding the read lock.
    pub(crate) fn with_top_level<R>(&self, f: impl FnOnce(&[RegionNode]) -> R) -> R {
        f(&self.roots.read())
    }

    /// Check whether the table holds no regions.
    pub fn is_empty(&self) -> bool {
        self.roots.read().is_empty()
    }
}
