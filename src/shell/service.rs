//! Peek Service
//!
//! Holds the single pending [`PeekRequest`] and drives the validator and
//! the bounded reader for it.
//!
//! # Security Considerations
//! - configure and read are serialised through one lock
//! - The whole range is validated before the first word is touched
//! - Each word is re-validated against the live region table right before
//!   it is mapped, and must still fall in the region the range was
//!   validated against
//! - Any failure abandons the read; no partial result is returned
//!
//! The request lock is held across every host read of a request. With the
//! `std` feature it yields to the scheduler while contended instead of
//! spinning.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::cap::{MemoryCapability, Rights};
use crate::error::PeekError;
use crate::mm::{read_word, PhysMapper};
use crate::region::RegionTable;

use super::request::PeekRequest;
use super::result::{PeekResult, PeekWord};

#[cfg(feature = "std")]
type RequestSlot = spin::mutex::Mutex<PeekRequest, spin::relax::Yield>;
#[cfg(not(feature = "std"))]
type RequestSlot = spin::Mutex<PeekRequest>;

/// The administrative operations a transport exposes.
pub trait AdminInterface {
    /// Replace the pending request with one parsed from `input`.
    ///
    /// On error the pending request is left unchanged.
    fn configure(&self, input: &str) -> Result<PeekRequest, PeekError>;

    /// Read the words of the pending request.
    fn read(&self) -> Result<PeekResult, PeekError>;
}

/// Region-validated access to physical memory through a [`PhysMapper`].
pub struct PeekService<M: PhysMapper> {
    regions: Arc<RegionTable>,
    mapper: M,
    capability: Option<MemoryCapability>,
    request: RequestSlot,
}

impl<M: PhysMapper> PeekService<M> {
    /// Create a service over a shared region table.
    pub fn new(regions: Arc<RegionTable>, mapper: M) -> Self {
        Self {
            regions,
            mapper,
            capability: None,
            request: RequestSlot::new(PeekRequest::default()),
        }
    }

    /// Restrict every read to the window granted by `capability`.
    pub fn with_capability(mut self, capability: MemoryCapability) -> Self {
        self.capability = Some(capability);
        self
    }

    /// The region table reads are validated against.
    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    /// The host mapper reads go through.
    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    /// Snapshot of the pending request.
    pub fn request(&self) -> PeekRequest {
        *self.request.lock()
    }

    /// Read the words of an explicit request, ignoring the pending one.
    pub fn peek(&self, request: &PeekRequest) -> Result<PeekResult, PeekError> {
        let address = request.address();
        let count = request.words();

        let region = self.regions.validate_range(address, count)?;
        log::debug!(
            "{} word(s) at {} validated against {:?}",
            count,
            address,
            region.label
        );

        if let Some(cap) = &self.capability {
            if !cap.permits(address, count, Rights::READ) {
                log::warn!("capability {} denies {} word(s) at {}", cap.badge(), count, address);
                return Err(PeekError::CapabilityDenied {
                    address,
                    words: count,
                });
            }
        }

        let mut words = Vec::new();
        words
            .try_reserve_exact(count)
            .map_err(|_| PeekError::Allocation { words: count })?;

        for index in 0..count {
            let at = request
                .word_address(index)
                .ok_or(PeekError::RegionNotFound {
                    address,
                    words: count,
                })?;

            // The table may have changed since the whole-range check; the
            // word must still sit in the very region validated above.
            if self.regions.validate_range(at, 1)? != region {
                log::warn!("region {:?} changed during read at {}", region.label, at);
                return Err(PeekError::RegionNotFound {
                    address,
                    words: count,
                });
            }

            let value = read_word(&self.mapper, at).map_err(|source| {
                log::warn!("read of {} abandoned: {}", at, source);
                PeekError::Map {
                    address: at,
                    source,
                }
            })?;
            words.push(PeekWord { address: at, value });
        }

        Ok(PeekResult::new(address, words))
    }
}

impl<M: PhysMapper> AdminInterface for PeekService<M> {
    fn configure(&self, input: &str) -> Result<PeekRequest, PeekError> {
        let parsed = PeekRequest::parse(input)?;
        *self.request.lock() = parsed;
        log::info!("configured {} word(s) at {}", parsed.words(), parsed.address());
        Ok(parsed)
    }

    fn read(&self) -> Result<PeekResult, PeekError> {
        // Held for the whole read so a concurrent configure cannot
        // interleave with it.
        let request = self.request.lock();
        self.peek(&request)
    }
}

impl<M: PhysMapper> core::fmt::Debug for PeekService<M> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PeekService")
            .field("capability", &self.capability)
            .field("request", &self.request())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::{MappingError, PhysAddr, SimulatedMemory};
    use crate::region::RegionFlags;
    use crate::shell::ConfigParseError;
    use core::sync::atomic::{AtomicBool, Ordering};

    /// Mapper that splits 0x1000-0x2fff in two on its first mapping.
    struct SplittingMapper {
        regions: Arc<RegionTable>,
        inner: SimulatedMemory,
        split: AtomicBool,
    }

    impl PhysMapper for SplittingMapper {
        type Handle = <SimulatedMemory as PhysMapper>::Handle;

        fn map(&self, frame: PhysAddr) -> Result<Self::Handle, MappingError> {
            if !self.split.swap(true, Ordering::SeqCst) {
                self.regions
                    .release_region(PhysAddr::new(0x1000), PhysAddr::new(0x2fff))
                    .unwrap();
                for (start, end) in [(0x1000, 0x1fff), (0x2000, 0x2fff)] {
                    self.regions
                        .request_region(PhysAddr::new(start), PhysAddr::new(end), "split", RegionFlags::MEM)
                        .unwrap();
                }
            }
            self.inner.map(frame)
        }

        fn read(&self, handle: &Self::Handle, offset: usize, buf: &mut [u8]) -> Result<(), MappingError> {
            self.inner.read(handle, offset, buf)
        }

        fn unmap(&self, handle: Self::Handle) {
            self.inner.unmap(handle)
        }
    }

    fn service() -> PeekService<SimulatedMemory> {
        let regions = Arc::new(RegionTable::new());
        regions
            .request_region(
                PhysAddr::new(0x1000),
                PhysAddr::new(0x2fff),
                "System RAM",
                RegionFlags::MEM | RegionFlags::SYSRAM,
            )
            .unwrap();

        let mem = SimulatedMemory::new();
        for i in 0..0x800u32 {
            mem.write_u32(PhysAddr::new(0x1000 + u64::from(i) * 4), 0x1000_0000 | i);
        }
        PeekService::new(regions, mem)
    }

    #[test]
    fn test_configure_then_read() {
        let service = service();
        service.configure("1000:4").unwrap();

        let result = service.read().unwrap();
        let addresses: Vec<_> = result.words().iter().map(|w| w.address.as_u64()).collect();
        assert_eq!(addresses, [0x1000, 0x1004, 0x1008, 0x100c]);
        assert_eq!(
            result.values().collect::<Vec<_>>(),
            [0x1000_0000, 0x1000_0001, 0x1000_0002, 0x1000_0003]
        );
        assert_eq!(service.mapper().live_mappings(), 0);
    }

    #[test]
    fn test_bad_configure_keeps_previous_request() {
        let service = service();
        service.configure("1000:4").unwrap();

        assert_eq!(
            service.configure(""),
            Err(PeekError::ConfigParse(ConfigParseError::Empty))
        );
        assert!(matches!(
            service.configure("not-a-number"),
            Err(PeekError::ConfigParse(_))
        ));
        assert_eq!(
            service.request(),
            PeekRequest::new(PhysAddr::new(0x1000), 4).unwrap()
        );
    }

    #[test]
    fn test_unclaimed_range_reads_nothing() {
        let service = service();
        service.configure("2ffc:2").unwrap();

        assert_eq!(
            service.read(),
            Err(PeekError::RegionNotFound {
                address: PhysAddr::new(0x2ffc),
                words: 2
            })
        );
        assert_eq!(service.mapper().total_mappings(), 0);
    }

    #[test]
    fn test_map_failure_returns_no_partial_result() {
        let regions = Arc::new(RegionTable::new());
        regions
            .request_region(PhysAddr::new(0x1000), PhysAddr::new(0x2fff), "ram", RegionFlags::MEM)
            .unwrap();
        let mem = SimulatedMemory::new();
        // Only the first page is backed.
        mem.back_frame(PhysAddr::new(0x1000));
        let service = PeekService::new(regions, mem);

        service.configure("1ff8:4").unwrap();
        assert_eq!(
            service.read(),
            Err(PeekError::Map {
                address: PhysAddr::new(0x2000),
                source: MappingError::InvalidFrame(PhysAddr::new(0x2000)),
            })
        );
        assert_eq!(service.mapper().live_mappings(), 0);
    }

    #[test]
    fn test_capability_limits_reads() {
        let cap = MemoryCapability::new(
            PhysAddr::new(0x1000),
            PhysAddr::new(0x10ff),
            Rights::READ,
            1,
        )
        .unwrap();
        let service = service().with_capability(cap);

        service.configure("10fc:1").unwrap();
        assert!(service.read().is_ok());

        service.configure("10fc:2").unwrap();
        assert_eq!(
            service.read(),
            Err(PeekError::CapabilityDenied {
                address: PhysAddr::new(0x10fc),
                words: 2
            })
        );
    }

    #[test]
    fn test_huge_request_fails_allocation_before_reading() {
        let regions = Arc::new(RegionTable::new());
        regions
            .request_region(PhysAddr::new(0), PhysAddr::MAX, "everything", RegionFlags::MEM)
            .unwrap();
        let service = PeekService::new(regions, SimulatedMemory::new());

        let words = usize::MAX / 8;
        let request = PeekRequest::new(PhysAddr::new(0), words).unwrap();
        assert_eq!(
            service.peek(&request),
            Err(PeekError::Allocation { words })
        );
        assert_eq!(service.mapper().total_mappings(), 0);
    }

    #[test]
    fn test_region_split_mid_read_abandons_read() {
        let regions = Arc::new(RegionTable::new());
        regions
            .request_region(PhysAddr::new(0x1000), PhysAddr::new(0x2fff), "ram", RegionFlags::MEM)
            .unwrap();
        let mem = SimulatedMemory::new();
        mem.back_frame(PhysAddr::new(0x1000));
        mem.back_frame(PhysAddr::new(0x2000));
        let mapper = SplittingMapper {
            regions: Arc::clone(&regions),
            inner: mem,
            split: AtomicBool::new(false),
        };
        let service = PeekService::new(regions, mapper);

        service.configure("1ff8:4").unwrap();
        assert_eq!(
            service.read(),
            Err(PeekError::RegionNotFound {
                address: PhysAddr::new(0x1ff8),
                words: 4
            })
        );
        assert!(service.mapper().split.load(Ordering::SeqCst));
        assert_eq!(service.mapper().inner.live_mappings(), 0);
    }

    #[test]
    fn test_initial_request() {
        assert_eq!(service().request(), PeekRequest::default());
    }
}
