//! iomem Region Table Loader
//!
//! Builds a [`RegionTable`] from the host's textual memory-region listing:
//!
//! ```text
//! 00000000-00000fff : Reserved
//! 00001000-0009fbff : System RAM
//!   01000000-01ffffff : Kernel code
//! ```
//!
//! Each nesting level is indented by two spaces. Bounds are inclusive
//! hexadecimal addresses.

use std::fs;
use std::path::Path;

use alloc::string::String;
use alloc::vec::Vec;

use crate::mm::PhysAddr;

use super::resource::{MemoryRegion, RegionFlags, RegionNode, RegionTable};

/// Default location of the host's region listing.
pub const DEFAULT_IOMEM: &str = "/proc/iomem";

/// Error type for loading a region listing.
#[derive(Debug, thiserror::Error)]
pub enum IomemError {
    /// The listing could not be read.
    #[error("cannot read region listing: {0}")]
    Io(#[from] std::io::Error),
    /// A line did not have the `start-end : label` shape.
    #[error("line {line}: {reason}")]
    Malformed {
        /// One-based line number.
        line: usize,
        /// What was wrong with it.
        reason: &'static str,
    },
}

/// Read and parse a region listing from `path`.
pub fn load_iomem(path: impl AsRef<Path>) -> Result<RegionTable, IomemError> {
    let text = fs::read_to_string(path)?;
    parse_iomem(&text)
}

/// Parse a region listing.
pub fn parse_iomem(text: &str) -> Result<RegionTable, IomemError> {
    let mut roots: Vec<RegionNode> = Vec::new();
    // Path of child indices from the roots to the most recent node.
    let mut path: Vec<usize> = Vec::new();
    let mut all_zero = true;
    let mut count = 0usize;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }

        let indent = raw.len() - raw.trim_start_matches(' ').len();
        let depth = indent / 2;
        if depth > path.len() {
            return Err(IomemError::Malformed {
                line,
                reason: "indented deeper than its parent",
            });
        }

        let region = parse_line(raw.trim()).ok_or(IomemError::Malformed {
            line,
            reason: "expected `start-end : label`",
        })?;
        all_zero &= region.start.as_u64() == 0 && region.end.as_u64() == 0;
        count += 1;

        path.truncate(depth);
        let level = level_at(&mut roots, &path);
        level.push(RegionNode::new(region));
        path.push(level.len() - 1);
    }

    if count > 0 && all_zero {
        log::warn!("region listing is redacted (all addresses zero); insufficient privileges?");
    }
    log::debug!("loaded {} region(s)", count);

    Ok(RegionTable::from_nodes(roots))
}

fn level_at<'a>(roots: &'a mut Vec<RegionNode>, path: &[usize]) -> &'a mut Vec<RegionNode> {
    let mut level = roots;
    for &idx in path {
        level = &mut level[idx].children;
    }
    level
}

fn parse_line(line: &str) -> Option<MemoryRegion> {
    let (range, label) = line.split_once(" : ")?;
    let (start, end) = range.trim().split_once('-')?;
    let start = PhysAddr::new(u64::from_str_radix(start, 16).ok()?);
    let end = PhysAddr::new(u64::from_str_radix(end, 16).ok()?);
    let label = String::from(label.trim());
    let flags = flags_for(&label);

    MemoryRegion::new(start, end, label, flags)
}

fn flags_for(label: &str) -> RegionFlags {
    if label.starts_with("System RAM") {
        RegionFlags::MEM | RegionFlags::SYSRAM | RegionFlags::BUSY
    } else if label.starts_with("PCI Bus") {
        RegionFlags::MEM
    } else {
        RegionFlags::MEM | RegionFlags::BUSY
    }
}
