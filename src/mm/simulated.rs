//! Simulated Physical Memory
//!
//! A sparse, page-granular backing store that stands in for the host's
//! physical memory. Frames that were never written are not backed and
//! fail to map, the way a hole in the physical address space would.
//!
//! The store also models the host's limited pool of mapping slots, so
//! resource exhaustion can be exercised without privileged hardware.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use core::sync::atomic::{AtomicUsize, Ordering};

use spin::Mutex;

use super::address::{PhysAddr, PAGE_SIZE};
use super::mapper::{MappingError, PhysMapper};

/// Default number of mappings that may be live at the same time.
pub const DEFAULT_MAPPING_SLOTS: usize = 16;

type Frame = Box<[u8; PAGE_SIZE]>;

/// In-memory physical memory with a bounded mapping pool.
#[derive(Debug)]
pub struct SimulatedMemory {
    /// Backed frames keyed by page frame number.
    frames: Mutex<BTreeMap<u64, Frame>>,
    /// Maximum number of live mappings.
    slots: usize,
    /// Mappings currently live.
    live: AtomicUsize,
    /// Mappings handed out over the lifetime of the store.
    total: AtomicUsize,
}

/// Handle for a frame mapped out of [`SimulatedMemory`].
#[derive(Debug)]
pub struct SimulatedMapping {
    pfn: u64,
}

impl SimulatedMemory {
    /// Create an empty store with the default mapping pool.
    pub fn new() -> Self {
        Self::with_mapping_slots(DEFAULT_MAPPING_SLOTS)
    }

    /// Create an empty store allowing at most `slots` live mappings.
    pub fn with_mapping_slots(slots: usize) -> Self {
        Self {
            frames: Mutex::new(BTreeMap::new()),
            slots,
            live: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
        }
    }

    /// Write raw bytes into the store, backing frames as needed.
    ///
    /// This is the host side of the store and may span several pages.
    /// Bytes that would run past the top of the address space are dropped.
    pub fn write_bytes(&self, addr: PhysAddr, bytes: &[u8]) {
        let mut frames = self.frames.lock();
        for (i, &byte) in bytes.iter().enumerate() {
            let Some(at) = addr.checked_add(i as u64) else {
                break;
            };
            let frame = frames
                .entry(at.page_frame_number())
                .or_insert_with(|| Box::new([0; PAGE_SIZE]));
            frame[at.page_offset()] = byte;
        }
    }

    /// Store a little-endian 32-bit value.
    pub fn write_u32(&self, addr: PhysAddr, value: u32) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    /// Back a frame with zeros without writing any data.
    pub fn back_frame(&self, addr: PhysAddr) {
        self.frames
            .lock()
            .entry(addr.page_frame_number())
            .or_insert_with(|| Box::new([0; PAGE_SIZE]));
    }

    /// Number of mappings currently live.
    pub fn live_mappings(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Number of mappings handed out so far.
    pub fn total_mappings(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    /// Take a slot from the mapping pool, failing fast when it is empty.
    fn claim_slot(&self) -> Result<(), MappingError> {
        self.live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                (live < self.slots).then_some(live + 1)
            })
            .map(|_| ())
            .map_err(|_| MappingError::Exhausted)
    }
}

impl Default for SimulatedMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysMapper for SimulatedMemory {
    type Handle = SimulatedMapping;

    fn map(&self, frame: PhysAddr) -> Result<Self::Handle, MappingError> {
        let pfn = frame.page_frame_number();
        if !self.frames.lock().contains_key(&pfn) {
            return Err(MappingError::InvalidFrame(frame));
        }

        self.claim_slot()?;
        self.total.fetch_add(1, Ordering::AcqRel);
        Ok(SimulatedMapping { pfn })
    }

    fn read(
        &self,
        handle: &Self::Handle,
        offset: usize,
        buf: &mut [u8],
    ) -> Result<(), MappingError> {
        let frames = self.frames.lock();
        let Some(frame) = frames.get(&handle.pfn) else {
            // Frame vanished while mapped.
            let addr = PhysAddr::from_page_frame_number(handle.pfn).unwrap_or(PhysAddr::MAX);
            return Err(MappingError::InvalidFrame(addr));
        };

        let src = frame
            .get(offset..offset + buf.len())
            .ok_or(MappingError::CrossesPage(PhysAddr::MAX))?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn unmap(&self, _handle: Self::Handle) {
        self.live.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::MappedPage;

    #[test]
    fn test_unbacked_frame_does_not_map() {
        let mem = SimulatedMemory::new();
        let err = MappedPage::map(&mem, PhysAddr::new(0x2000)).unwrap_err();
        assert_eq!(err, MappingError::InvalidFrame(PhysAddr::new(0x2000)));
        assert_eq!(mem.live_mappings(), 0);
    }

    #[test]
    fn test_guard_releases_slot() {
        let mem = SimulatedMemory::new();
        mem.write_u32(PhysAddr::new(0x1004), 0xdead_beef);
        {
            let page = MappedPage::map(&mem, PhysAddr::new(0x1004)).unwrap();
            assert_eq!(page.frame(), PhysAddr::new(0x1000));
            assert_eq!(mem.live_mappings(), 1);

            let mut word = [0u8; 4];
            page.read(4, &mut word).unwrap();
            assert_eq!(u32::from_le_bytes(word), 0xdead_beef);
        }
        assert_eq!(mem.live_mappings(), 0);
        assert_eq!(mem.total_mappings(), 1);
    }

    #[test]
    fn test_guard_releases_slot_on_read_error() {
        let mem = SimulatedMemory::new();
        mem.back_frame(PhysAddr::new(0x1000));
        {
            let page = MappedPage::map(&mem, PhysAddr::new(0x1000)).unwrap();
            let mut word = [0u8; 4];
            let err = page.read(PAGE_SIZE - 2, &mut word).unwrap_err();
            assert_eq!(err, MappingError::CrossesPage(PhysAddr::new(0x1ffe)));
        }
        assert_eq!(mem.live_mappings(), 0);
    }

    #[test]
    fn test_pool_exhaustion_fails_fast() {
        let mem = SimulatedMemory::with_mapping_slots(1);
        mem.back_frame(PhysAddr::new(0x1000));

        let held = MappedPage::map(&mem, PhysAddr::new(0x1000)).unwrap();
        let err = MappedPage::map(&mem, PhysAddr::new(0x1000)).unwrap_err();
        assert_eq!(err, MappingError::Exhausted);

        drop(held);
        assert!(MappedPage::map(&mem, PhysAddr::new(0x1000)).is_ok());
    }

    #[test]
    fn test_write_spans_frames() {
        let mem = SimulatedMemory::new();
        mem.write_bytes(PhysAddr::new(0x1ffe), &[1, 2, 3, 4]);

        let page = MappedPage::map(&mem, PhysAddr::new(0x2000)).unwrap();
        let mut tail = [0u8; 2];
        page.read(0, &mut tail).unwrap();
        assert_eq!(tail, [3, 4]);
    }
}
