//! Peek Results
//!
//! The words read for one request, in address order, and their line
//! format:
//!
//! ```text
//! read 2 words from address 0x00001000
//! 0x00001000: 0xdeadbeef
//! 0x00001004: 0x00000000
//! ```

use alloc::vec::Vec;
use core::fmt;

use crate::mm::PhysAddr;

/// One word read from physical memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeekWord {
    /// Physical address of the word.
    pub address: PhysAddr,
    /// Value read from it.
    pub value: u32,
}

impl fmt::Display for PeekWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#010x}", self.address, self.value)
    }
}

/// Every word of one completed read.
///
/// A result only exists when every requested word was read; there are no
/// placeholder entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeekResult {
    address: PhysAddr,
    words: Vec<PeekWord>,
}

impl PeekResult {
    pub(crate) fn new(address: PhysAddr, words: Vec<PeekWord>) -> Self {
        Self { address, words }
    }

    /// Address of the first word.
    pub fn address(&self) -> PhysAddr {
        self.address
    }

    /// The words in address order.
    pub fn words(&self) -> &[PeekWord] {
        &self.words
    }

    /// Just the values, in address order.
    pub fn values(&self) -> impl Iterator<Item = u32> + '_ {
        self.words.iter().map(|word| word.value)
    }

    /// Number of words read.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check whether no words were read.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl fmt::Display for PeekResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "read {} words from address {}", self.len(), self.address)?;
        for word in &self.words {
            writeln!(f, "{}", word)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a PeekResult {
    type Item = &'a PeekWord;
    type IntoIter = core::slice::Iter<'a, PeekWord>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.iter()
    }
}
