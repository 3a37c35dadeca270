/*!
 * Paging Tests
 * Frame assignment, page tables and atomic failure
 */

use partsim::core::limits::{KIB, MIB};
use partsim::memory::{
    AddressSpace, AllocationRequest, BackingStore, MemoryError, PageAllocator, PageTableEntry,
    Placement,
};
use partsim::{MemoryId, Size};
use pretty_assertions::assert_eq;

fn store() -> PageAllocator {
    PageAllocator::new(AddressSpace::new(16 * MIB, MIB).unwrap(), 64 * KIB).unwrap()
}

fn request(id: u32, size: Size) -> AllocationRequest {
    AllocationRequest::new(MemoryId(id), format!("p{} #1", id)).with_segment(".text", size)
}

fn frames_of(store: &PageAllocator, id: u32) -> Vec<usize> {
    store
        .frames()
        .iter()
        .filter(|f| f.is_owned_by(MemoryId(id)))
        .map(|f| f.id)
        .collect()
}

#[test]
fn test_frames_tile_user_space() {
    let store = store();
    assert_eq!(store.frames().len(), 240);
    assert_eq!(store.frames()[0].address, MIB);
    assert_eq!(store.frames()[239].address + 64 * KIB, 16 * MIB);
    // Only the OS partition: 15 MiB divides evenly into 64 KiB frames
    assert_eq!(store.partitions().len(), 1);
}

#[test]
fn test_three_pages_take_lowest_frames() {
    let mut store = store();
    let placement = store.allocate(&request(1, 150 * KIB)).unwrap();

    assert_eq!(
        placement,
        Placement::Pages(
            (0..3)
                .map(|page| PageTableEntry {
                    segment: ".text".to_string(),
                    logical_page: page,
                    frame_id: page,
                })
                .collect()
        )
    );
    assert_eq!(store.frames()[2].internal_fragmentation(), 42 * KIB);

    assert_eq!(store.free_process(MemoryId(1)), 192 * KIB);
    assert!(frames_of(&store, 1).is_empty());
    assert!(store.frames()[..3]
        .iter()
        .all(|f| f.is_free() && f.logical_page.is_none() && f.owner.is_none()));
}

#[test]
fn test_freed_frames_are_reused_first() {
    let mut store = store();
    store.allocate(&request(1, 128 * KIB)).unwrap();
    store.allocate(&request(2, 64 * KIB)).unwrap();
    store.free_process(MemoryId(1));

    store.allocate(&request(3, 150 * KIB)).unwrap();
    assert_eq!(frames_of(&store, 3), vec![0, 1, 3]);
    assert_eq!(frames_of(&store, 2), vec![2]);
}

#[test]
fn test_not_enough_frames_is_atomic() {
    let mut store = store();
    store.allocate(&request(1, 14 * MIB)).unwrap();
    let before = store.frames().to_vec();

    let request = AllocationRequest::new(MemoryId(2), "excel #1")
        .with_segment(".text", 512 * KIB)
        .with_segment(".data", 600 * KIB);
    let err = store.allocate(&request).unwrap_err();

    assert_eq!(
        err,
        MemoryError::InsufficientMemory {
            requested: 18 * 64 * KIB,
            largest_free: 64 * KIB,
            total_free: 16 * 64 * KIB,
        }
    );
    assert_eq!(store.frames(), before.as_slice());
}

#[test]
fn test_zero_sized_segments_take_no_frames() {
    let mut store = store();
    let request = AllocationRequest::new(MemoryId(1), "publisher #1")
        .with_segment(".text", 10 * KIB)
        .with_segment(".bss", 0);

    let Placement::Pages(table) = store.allocate(&request).unwrap() else {
        panic!("paging returns a page table");
    };
    assert_eq!(table.len(), 1);
    assert_eq!(store.free_frames(), 239);
}

#[test]
fn test_zero_page_size_is_rejected() {
    let space = AddressSpace::new(16 * MIB, MIB).unwrap();
    assert!(matches!(
        PageAllocator::new(space, 0),
        Err(MemoryError::InvalidRequest(_))
    ));
}
