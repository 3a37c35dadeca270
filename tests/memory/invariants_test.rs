/*!
 * Backing Store Invariants
 * Property tests over random allocate/free sequences
 */

use partsim::core::limits::{KIB, MIB};
use partsim::memory::{
    AddressSpace, AllocationRequest, BackingStore, DynamicPartitioner, FitPolicy, PageAllocator,
    SegmentAllocator, StaticPartitioner,
};
use partsim::{MemoryId, Size};
use proptest::prelude::*;
use proptest::sample::Index;

const TOTAL: Size = 16 * MIB;

#[derive(Debug, Clone)]
enum Op {
    Allocate(Vec<Size>),
    Free(Index),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop::collection::vec(0usize..3072, 1..4)
            .prop_map(|sizes| Op::Allocate(sizes.into_iter().map(|kib| kib * KIB).collect())),
        2 => any::<Index>().prop_map(Op::Free),
    ]
}

fn policy() -> impl Strategy<Value = FitPolicy> {
    prop_oneof![
        Just(FitPolicy::FirstFit),
        Just(FitPolicy::BestFit),
        Just(FitPolicy::WorstFit),
    ]
}

fn space() -> AddressSpace {
    AddressSpace::new(TOTAL, MIB).unwrap()
}

fn request(id: u32, sizes: &[Size]) -> AllocationRequest {
    sizes
        .iter()
        .enumerate()
        .fold(AllocationRequest::new(MemoryId(id), format!("p{}", id)), |req, (i, &size)| {
            req.with_segment(format!(".s{}", i), size)
        })
}

/// Partitions and frames together cover [0, TOTAL) without gaps or overlap
fn assert_tiles(store: &dyn BackingStore) {
    let partitions = store.partitions();
    for pair in partitions.windows(2) {
        assert!(pair[0].address < pair[1].address, "partitions out of order");
    }

    let mut spans: Vec<(usize, Size)> = partitions
        .iter()
        .map(|p| (p.address, p.size))
        .chain(store.frames().iter().map(|f| (f.address, f.size)))
        .collect();
    spans.sort_unstable();

    let mut cursor = 0;
    for (address, size) in spans {
        assert_eq!(address, cursor, "gap or overlap at {:#x}", address);
        cursor += size;
    }
    assert_eq!(cursor, TOTAL);
    assert_eq!(store.stats().total_memory, TOTAL);
}

fn assert_no_adjacent_free(store: &dyn BackingStore) {
    for pair in store.partitions().windows(2) {
        assert!(
            !(pair[0].is_free() && pair[1].is_free()),
            "adjacent free regions at {:#x} and {:#x}",
            pair[0].address,
            pair[1].address
        );
    }
}

/// Apply `ops`, checking `check` after each; failed allocations must not change anything
fn run(store: &mut dyn BackingStore, ops: &[Op], check: fn(&dyn BackingStore)) -> Vec<MemoryId> {
    let mut live = Vec::new();
    let mut next = 1;

    for op in ops {
        match op {
            Op::Allocate(sizes) => {
                let before = (store.partitions(), store.frames().to_vec());
                let id = MemoryId(next);
                next += 1;
                if store.allocate(&request(id.0, sizes)).is_ok() {
                    live.push(id);
                } else {
                    assert_eq!((store.partitions(), store.frames().to_vec()), before);
                }
            }
            Op::Free(index) if !live.is_empty() => {
                let id = live.remove(index.index(live.len()));
                store.free_process(id);
                assert!(store.regions_of(id).is_empty());
            }
            Op::Free(_) => {}
        }
        check(store);
    }
    live
}

fn check_dynamic(store: &dyn BackingStore) {
    assert_tiles(store);
    assert_no_adjacent_free(store);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_dynamic_layout_stays_consistent(
        ops in prop::collection::vec(op(), 1..48),
        policy in policy(),
        threshold_kib in 0usize..64,
    ) {
        let mut store = DynamicPartitioner::new(space(), policy)
            .with_split_threshold(threshold_kib * KIB)
            .with_compaction(true);
        run(&mut store, &ops, check_dynamic);

        store.compact().unwrap();
        let once = store.partitions();
        check_dynamic(&store);
        store.compact().unwrap();
        prop_assert_eq!(store.partitions(), once);
    }

    #[test]
    fn prop_dynamic_allocate_free_round_trip(
        ops in prop::collection::vec(op(), 0..32),
        policy in policy(),
        size_kib in 1usize..4096,
    ) {
        let mut store = DynamicPartitioner::new(space(), policy).with_split_threshold(16 * KIB);
        run(&mut store, &ops, check_dynamic);

        let before = store.partitions();
        let probe = MemoryId(u32::MAX);
        if store.allocate(&request(probe.0, &[size_kib * KIB])).is_ok() {
            store.free_process(probe);
        }
        prop_assert_eq!(store.partitions(), before);
    }

    #[test]
    fn prop_segmentation_is_atomic(
        ops in prop::collection::vec(op(), 1..48),
        policy in policy(),
    ) {
        let mut store = SegmentAllocator::new(space(), policy);
        run(&mut store, &ops, check_dynamic);
    }

    #[test]
    fn prop_paging_is_atomic(
        ops in prop::collection::vec(op(), 1..48),
        page_kib in 32usize..256,
    ) {
        let mut store = PageAllocator::new(space(), page_kib * KIB).unwrap();
        let live = run(&mut store, &ops, assert_tiles);

        let owned = store.frames().iter().filter(|f| !f.is_free()).count();
        let expected: usize = live
            .iter()
            .map(|&id| store.frames().iter().filter(|f| f.is_owned_by(id)).count())
            .sum();
        prop_assert_eq!(owned, expected);
    }

    #[test]
    fn prop_static_variable_keeps_shape(
        ops in prop::collection::vec(op(), 1..48),
        policy in policy(),
    ) {
        let sizes: Vec<Size> = [1, 1, 2, 2, 3, 5].iter().map(|s| s * MIB).collect();
        let mut store = StaticPartitioner::variable(space(), &sizes, policy).unwrap();
        run(&mut store, &ops, assert_tiles);
        prop_assert_eq!(store.partitions().len(), 8);
    }
}
