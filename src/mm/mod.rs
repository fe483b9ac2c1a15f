//! Physical memory access for mempeek
//!
//! Provides:
//! - Physical address types
//! - Transient page mappings behind the host's [`PhysMapper`] primitive
//! - The bounded single-word reader
//!
//! # Security Principles
//! - Physical addresses are never dereferenced directly
//! - No mapping outlives the word it was created for
//! - No unsafe code

pub mod address;
mod mapper;
mod reader;
mod simulated;

#[cfg(feature = "std")]
mod devmem;

pub use address::{PhysAddr, PAGE_SIZE, WORD_SIZE};
pub use mapper::{MappedPage, MappingError, PhysMapper};
pub use reader::read_word;
pub use simulated::{SimulatedMapping, SimulatedMemory, DEFAULT_MAPPING_SLOTS};

#[cfg(feature = "std")]
pub use devmem::{DevMem, DevMemWindow, DEFAULT_DEVICE};
