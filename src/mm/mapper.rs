//! Transient Physical Page Mappings
//!
//! A [`PhysMapper`] is the host's privileged memory-access primitive: it
//! makes one physical page readable for a short time. Callers never talk to
//! the mapper directly; they go through [`MappedPage`], which releases the
//! mapping when it is dropped.
//!
//! # Security Properties
//! - Only whole page frames are mapped, one at a time
//! - Every read is bounds-checked against the mapped page
//! - The mapping is released on every exit path, including errors

use super::address::{PhysAddr, PAGE_SIZE};

/// Error type for page mapping operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    /// The page frame is not backed by anything the host can map.
    #[error("page frame {0} cannot be mapped")]
    InvalidFrame(PhysAddr),
    /// The host has no mapping slots left.
    #[error("host mapping resources exhausted")]
    Exhausted,
    /// The access would run past the end of the mapped page.
    #[error("access at {0} crosses a page boundary")]
    CrossesPage(PhysAddr),
    /// The host backend reported an I/O failure.
    #[error("host access failed (os error {code:?})")]
    Io {
        /// OS error code, when the host reported one.
        code: Option<i32>,
    },
}

/// The host primitive that makes a physical page frame readable.
///
/// Implementations hand out an opaque handle per mapping. The handle is
/// only ever used through a [`MappedPage`] and returned to [`unmap`]
/// exactly once.
///
/// [`unmap`]: PhysMapper::unmap
pub trait PhysMapper {
    /// Token identifying one live mapping.
    type Handle;

    /// Map the page frame starting at `frame` (page-aligned).
    fn map(&self, frame: PhysAddr) -> Result<Self::Handle, MappingError>;

    /// Copy `buf.len()` bytes starting at `offset` within the mapped page.
    ///
    /// The caller guarantees `offset + buf.len() <= PAGE_SIZE`.
    fn read(&self, handle: &Self::Handle, offset: usize, buf: &mut [u8])
        -> Result<(), MappingError>;

    /// Release a mapping.
    fn unmap(&self, handle: Self::Handle);
}

/// A RAII guard for one mapped page that automatically unmaps it on drop.
pub struct MappedPage<'m, M: PhysMapper> {
    mapper: &'m M,
    frame: PhysAddr,
    handle: Option<M::Handle>,
}

impl<'m, M: PhysMapper> MappedPage<'m, M> {
    /// Map the page frame containing `addr`.
    pub fn map(mapper: &'m M, addr: PhysAddr) -> Result<Self, MappingError> {
        let frame = addr.align_down();
        let handle = mapper.map(frame)?;
        log::debug!("mapped frame {}", frame);

        Ok(Self {
            mapper,
            frame,
            handle: Some(handle),
        })
    }

    /// Get the physical address of the mapped frame.
    #[inline]
    pub fn frame(&self) -> PhysAddr {
        self.frame
    }

    /// Copy bytes out of the mapped page.
    pub fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), MappingError> {
        let in_page = offset
            .checked_add(buf.len())
            .is_some_and(|end| end <= PAGE_SIZE);
        if !in_page {
            let at = self
                .frame
                .checked_add(offset as u64)
                .unwrap_or(PhysAddr::MAX);
            return Err(MappingError::CrossesPage(at));
        }

        match &self.handle {
            Some(handle) => self.mapper.read(handle, offset, buf),
            None => Err(MappingError::InvalidFrame(self.frame)),
        }
    }
}

impl<M: PhysMapper> Drop for MappedPage<'_, M> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.mapper.unmap(handle);
            log::debug!("unmapped frame {}", self.frame);
        }
    }
}

impl<M: PhysMapper> core::fmt::Debug for MappedPage<'_, M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "MappedPage({})", self.frame)
    }
}
