//! End-to-end behaviour of the configure/read path over simulated memory.

use std::sync::Arc;
use std::thread;

use mempeek::mm::SimulatedMemory;
use mempeek::{
    AdminInterface, ConfigParseError, MappingError, PeekError, PeekRequest, PeekService,
    PhysAddr, RegionFlags, RegionTable,
};

const RAM_START: u64 = 0x1000;
const RAM_END: u64 = 0x4fff;

fn host() -> (Arc<RegionTable>, PeekService<SimulatedMemory>) {
    let regions = Arc::new(RegionTable::new());
    regions
        .request_region(
            PhysAddr::new(0),
            PhysAddr::new(0xfff),
            "Reserved",
            RegionFlags::MEM | RegionFlags::BUSY,
        )
        .unwrap();
    regions
        .request_region(
            PhysAddr::new(RAM_START),
            PhysAddr::new(RAM_END),
            "System RAM",
            RegionFlags::MEM | RegionFlags::SYSRAM | RegionFlags::BUSY,
        )
        .unwrap();

    let mem = SimulatedMemory::new();
    let mut addr = 0;
    while addr <= RAM_END {
        mem.write_u32(PhysAddr::new(addr), (addr as u32).rotate_left(16));
        addr += 4;
    }

    let service = PeekService::new(Arc::clone(&regions), mem);
    (regions, service)
}

#[test]
fn four_words_at_word_stride() {
    let (_, service) = host();
    service.configure("1000:4").unwrap();

    let result = service.read().unwrap();
    assert_eq!(result.len(), 4);
    let addresses: Vec<u64> = result.words().iter().map(|w| w.address.as_u64()).collect();
    assert_eq!(addresses, [0x1000, 0x1004, 0x1008, 0x100c]);
    assert_eq!(result.words()[2].value, 0x1008u32.rotate_left(16));
}

#[test]
fn repeated_reads_are_identical() {
    let (_, service) = host();
    service.configure("2000:10").unwrap();

    let first = service.read().unwrap();
    let second = service.read().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn last_word_of_region_boundary() {
    let (_, service) = host();

    service.configure(&format!("{:x}:1", RAM_END - 3)).unwrap();
    assert!(service.read().is_ok());

    service.configure(&format!("{:x}:1", RAM_END - 2)).unwrap();
    assert_eq!(
        service.read(),
        Err(PeekError::RegionNotFound {
            address: PhysAddr::new(RAM_END - 2),
            words: 1
        })
    );
}

#[test]
fn range_spanning_two_regions_is_refused() {
    let (_, service) = host();
    service.configure("ff8:4").unwrap();

    assert!(matches!(
        service.read(),
        Err(PeekError::RegionNotFound { .. })
    ));
    assert_eq!(service.mapper().total_mappings(), 0);
}

#[test]
fn malformed_input_keeps_previous_request() {
    let (_, service) = host();
    service.configure("1000:4").unwrap();
    let before = service.read().unwrap();

    assert_eq!(
        service.configure("not-a-number"),
        Err(PeekError::ConfigParse(ConfigParseError::NotHex {
            field: mempeek::shell::RequestField::Address,
            text: "not-a-number".into(),
        }))
    );
    assert_eq!(
        service.configure(""),
        Err(PeekError::ConfigParse(ConfigParseError::Empty))
    );
    assert_eq!(
        service.configure("1000:0"),
        Err(PeekError::ConfigParse(ConfigParseError::ZeroLength))
    );

    assert_eq!(service.read().unwrap(), before);
}

#[test]
fn overflowing_range_never_wraps_to_zero() {
    let (_, service) = host();
    service.configure("ffffffffffffffff:10").unwrap();

    assert!(matches!(
        service.read(),
        Err(PeekError::RegionNotFound { .. })
    ));

    service.configure("fffffffffffffffc:2").unwrap();
    assert!(matches!(
        service.read(),
        Err(PeekError::RegionNotFound { .. })
    ));
    assert_eq!(service.mapper().total_mappings(), 0);
}

#[test]
fn released_region_stops_reads() {
    let (regions, service) = host();
    service.configure("1000:1").unwrap();
    assert!(service.read().is_ok());

    regions
        .release_region(PhysAddr::new(RAM_START), PhysAddr::new(RAM_END))
        .unwrap();
    assert!(matches!(
        service.read(),
        Err(PeekError::RegionNotFound { .. })
    ));
}

#[test]
fn exhausted_mapping_pool_abandons_read() {
    let regions = Arc::new(RegionTable::new());
    regions
        .request_region(PhysAddr::new(0), PhysAddr::new(0xfff), "ram", RegionFlags::MEM)
        .unwrap();
    let mem = SimulatedMemory::with_mapping_slots(0);
    mem.back_frame(PhysAddr::new(0));
    let service = PeekService::new(regions, mem);

    service.configure("0:2").unwrap();
    assert_eq!(
        service.read(),
        Err(PeekError::Map {
            address: PhysAddr::new(0),
            source: MappingError::Exhausted,
        })
    );
}

#[test]
fn explicit_request_bypasses_pending_slot() {
    let (_, service) = host();
    service.configure("1000:1").unwrap();

    let request = PeekRequest::new(PhysAddr::new(0x3000), 2).unwrap();
    let result = service.peek(&request).unwrap();
    assert_eq!(result.address(), PhysAddr::new(0x3000));
    assert_eq!(service.request().address(), PhysAddr::new(0x1000));
}

#[test]
fn concurrent_sessions_never_see_torn_requests() {
    let (_, service) = host();
    let service = Arc::new(service);

    let handles: Vec<_> = ["1000:4", "3000:8"]
        .into_iter()
        .map(|input| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..200 {
                    service.configure(input).unwrap();
                    let result = service.read().unwrap();
                    let start = result.address().as_u64();
                    assert!(start == 0x1000 || start == 0x3000);
                    let expected = if start == 0x1000 { 4 } else { 8 };
                    assert_eq!(result.len(), expected);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(service.mapper().live_mappings(), 0);
}
