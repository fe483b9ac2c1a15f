//! Bounded Word Reader
//!
//! Reads one 32-bit word from an already validated physical address
//! through a transient single-page mapping.

use super::address::{PhysAddr, PAGE_SIZE, WORD_SIZE};
use super::mapper::{MappedPage, MappingError, PhysMapper};

/// Read one little-endian word at `addr`.
///
/// The page containing `addr` is mapped for the duration of the call and
/// released before returning, on success and on failure alike. A word
/// that would straddle the end of its page is refused rather than read
/// through a second, unvalidated mapping.
pub fn read_word<M: PhysMapper>(mapper: &M, addr: PhysAddr) -> Result<u32, MappingError> {
    let offset = addr.page_offset();
    if offset + WORD_SIZE > PAGE_SIZE {
        return Err(MappingError::CrossesPage(addr));
    }

    let page = MappedPage::map(mapper, addr)?;
    let mut word = [0u8; WORD_SIZE];
    page.read(offset, &mut word)?;
    drop(page);

    Ok(u32::from_le_bytes(word))
}
