/*!
 * Allocator Tests
 * Allocation, splitting, release errors and backing-store exhaustion
 */

use mems::memory::{BackingError, BackingStore, LimitedBacking, MmapBacking, SegmentKind};
use mems::{ExtentPolicy, Handle, MemoryError, MemoryManager, MemsConfig};
use pretty_assertions::assert_eq;

fn started(config: MemsConfig) -> MemoryManager {
    let mut manager = MemoryManager::new(config).expect("valid config");
    manager.init().expect("init");
    manager
}

#[test]
fn test_zero_size_is_invalid() {
    let mut mems = started(MemsConfig::default());
    let before = mems.report().unwrap();

    assert_eq!(mems.allocate(0), Err(MemoryError::InvalidSize { size: 0 }));
    assert_eq!(mems.report().unwrap(), before);
}

#[test]
fn test_split_produces_adjacent_free_remainder() {
    let mut mems = started(MemsConfig::default());
    let page = mems.page_size();

    let handle = mems.allocate(300).unwrap();
    let extent = &mems.report().unwrap().extents[0];

    assert_eq!(extent.segments.len(), 2);
    assert_eq!(extent.segments[0].start, handle.raw());
    assert_eq!(extent.segments[0].size, 300);
    assert_eq!(extent.segments[0].kind, SegmentKind::Allocated);
    assert_eq!(extent.segments[1].start, handle.raw() + 300);
    assert_eq!(extent.segments[1].size, page - 300);
    assert_eq!(extent.segments[1].kind, SegmentKind::Free);
}

#[test]
fn test_live_allocations_never_overlap() {
    let mut mems = started(MemsConfig::default());
    let sizes = [10, 4000, 1, 257, 8192, 33, 700, 12000];

    let mut ranges: Vec<(usize, usize)> = sizes
        .iter()
        .map(|&size| {
            let handle = mems.allocate(size).unwrap();
            (handle.raw(), handle.raw() + size)
        })
        .collect();
    ranges.sort();

    for pair in ranges.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "{:?} overlaps {:?}", pair[0], pair[1]);
    }
    mems.check_invariants().unwrap();
}

#[test]
fn test_unknown_handle_changes_nothing() {
    let mut mems = started(MemsConfig::default());
    let handle = mems.allocate(100).unwrap();
    let before = mems.report().unwrap();

    let interior = Handle::from_raw(handle.raw() + 1);
    let free_tail = Handle::from_raw(handle.raw() + 100);
    let foreign = Handle::from_raw(0x10);

    for bogus in [interior, free_tail, foreign] {
        assert_eq!(mems.release(bogus), Err(MemoryError::UnknownHandle(bogus)));
    }
    assert_eq!(mems.report().unwrap(), before);
}

#[test]
fn test_double_release_is_an_error() {
    let mut mems = started(MemsConfig::default());
    let handle = mems.allocate(100).unwrap();

    assert_eq!(mems.release(handle), Ok(()));
    assert_eq!(mems.release(handle), Err(MemoryError::UnknownHandle(handle)));
}

#[test]
fn test_budget_exhaustion_reports_out_of_backing_memory() {
    let page = MmapBacking::new().page_size();
    let mut mems = started(MemsConfig::default().with_max_mapped_bytes(2 * page));

    // Fits in the initial extent
    mems.allocate(page).unwrap();
    // Needs one more page: still within budget
    mems.allocate(page).unwrap();

    match mems.allocate(1) {
        Err(MemoryError::OutOfBackingMemory { requested, source }) => {
            assert_eq!(requested, 1);
            assert!(matches!(source, BackingError::BudgetExhausted { .. }));
        }
        other => panic!("expected OutOfBackingMemory, got {:?}", other),
    }

    // The failed request left the session consistent
    let stats = mems.report().unwrap();
    assert_eq!(stats.extent_count, 2);
    assert_eq!(stats.allocated_bytes, 2 * page);
    mems.check_invariants().unwrap();
}

#[test]
fn test_custom_backing_store() {
    let inner = MmapBacking::new();
    let page = inner.page_size();
    let mut mems = MemoryManager::with_backing(
        MemsConfig::default().with_initial_pages(0),
        LimitedBacking::new(inner, page),
    )
    .unwrap();
    mems.init().unwrap();

    assert_eq!(mems.report().unwrap().extent_count, 0);
    mems.allocate(page).unwrap();
    assert!(mems.allocate(1).is_err());
}

#[test]
fn test_exact_policy_manages_only_requested_bytes() {
    let mut mems = started(
        MemsConfig::default()
            .with_initial_pages(0)
            .with_extent_policy(ExtentPolicy::Exact),
    );

    mems.allocate(10).unwrap();
    mems.allocate(10).unwrap();

    let stats = mems.report().unwrap();
    assert_eq!(stats.extent_count, 2);
    assert_eq!(stats.managed_bytes, 20);
    assert_eq!(stats.free_bytes, 0);
    assert_eq!(stats.mapped_bytes, 2 * mems.page_size());
}

#[test]
fn test_data_survives_neighbouring_churn() {
    let mut mems = started(MemsConfig::default());
    let keep = mems.allocate(64).unwrap();
    mems.write_bytes(keep, 0, b"mems keeps this payload").unwrap();

    for round in 0..50 {
        let scratch = mems.allocate(32 + round).unwrap();
        mems.write_bytes(scratch, 0, &vec![0xFF; 32 + round]).unwrap();
        mems.release(scratch).unwrap();
    }

    assert_eq!(
        mems.read_bytes(keep, 0, 23).unwrap(),
        b"mems keeps this payload".to_vec()
    );
}
