//! Peek Errors
//!
//! Every error is local to a single configure or read call; none of them
//! leaves the service unusable.

use crate::mm::{MappingError, PhysAddr};
use crate::shell::ConfigParseError;

/// Error type for configure and read operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeekError {
    /// The configuration string was malformed; nothing was changed.
    #[error("malformed request: {0}")]
    ConfigParse(#[from] ConfigParseError),
    /// No single region contains the requested range; nothing was read.
    #[error("no region contains {words} word(s) at {address}")]
    RegionNotFound {
        /// Start of the refused range.
        address: PhysAddr,
        /// Length of the refused range in words.
        words: usize,
    },
    /// Mapping a word failed; the read was abandoned.
    #[error("reading {address} failed: {source}")]
    Map {
        /// Word being read.
        address: PhysAddr,
        /// Host mapping failure.
        source: MappingError,
    },
    /// The result buffer could not be allocated; nothing was read.
    #[error("cannot allocate a buffer for {words} word(s)")]
    Allocation {
        /// Requested length in words.
        words: usize,
    },
    /// The host never granted read access to this range.
    #[error("capability does not grant read access to {words} word(s) at {address}")]
    CapabilityDenied {
        /// Start of the refused range.
        address: PhysAddr,
        /// Length of the refused range in words.
        words: usize,
    },
}
