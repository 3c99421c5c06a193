/*!
 * Session Lifecycle Tests
 * init/finish bracketing and the use-before-init / use-after-finish guards
 */

use mems::{Handle, MemoryError, MemoryManager, MemsConfig};
use pretty_assertions::assert_eq;

#[test]
fn test_calls_before_init_fail_fast() {
    let mut mems = MemoryManager::new(MemsConfig::default()).unwrap();
    let handle = Handle::from_raw(0x1000);

    assert_eq!(mems.allocate(10), Err(MemoryError::UseBeforeInit));
    assert_eq!(mems.release(handle), Err(MemoryError::UseBeforeInit));
    assert_eq!(mems.translate(handle), Err(MemoryError::UseBeforeInit));
    assert_eq!(mems.report().unwrap_err(), MemoryError::UseBeforeInit);
    assert_eq!(mems.finish(), Err(MemoryError::UseBeforeInit));
    assert!(!mems.is_active());
}

#[test]
fn test_calls_after_finish_fail_fast() {
    let mut mems = MemoryManager::new(MemsConfig::default()).unwrap();
    mems.init().unwrap();
    let handle = mems.allocate(128).unwrap();
    mems.finish().unwrap();

    assert_eq!(mems.allocate(10), Err(MemoryError::UseAfterFinish));
    assert_eq!(mems.release(handle), Err(MemoryError::UseAfterFinish));
    assert_eq!(mems.translate(handle), Err(MemoryError::UseAfterFinish));
    assert_eq!(
        mems.read_bytes(handle, 0, 1).unwrap_err(),
        MemoryError::UseAfterFinish
    );
    assert_eq!(mems.report().unwrap_err(), MemoryError::UseAfterFinish);
    assert_eq!(mems.finish(), Err(MemoryError::UseAfterFinish));
}

#[test]
fn test_init_maps_initial_extent() {
    let mut mems = MemoryManager::new(MemsConfig::default().with_initial_pages(2)).unwrap();
    mems.init().unwrap();

    let stats = mems.report().unwrap();
    assert_eq!(stats.extent_count, 1);
    assert_eq!(stats.mapped_pages, 2);
    assert_eq!(stats.free_bytes, 2 * mems.page_size());
    assert_eq!(stats.allocated_bytes, 0);
    assert_eq!(stats.segment_list_lengths(), vec![1]);
}

#[test]
fn test_double_init_is_rejected() {
    let mut mems = MemoryManager::new(MemsConfig::default()).unwrap();
    mems.init().unwrap();
    let handle = mems.allocate(64).unwrap();

    assert_eq!(mems.init(), Err(MemoryError::AlreadyInitialized));
    // The running session is untouched
    assert!(mems.is_valid(handle));
}

#[test]
fn test_reinit_starts_fresh_session() {
    let mut mems = MemoryManager::new(MemsConfig::default()).unwrap();
    mems.init().unwrap();
    let old = mems.allocate(64).unwrap();
    mems.allocate(3 * mems.page_size()).unwrap();
    mems.finish().unwrap();

    mems.init().unwrap();
    let stats = mems.report().unwrap();
    assert_eq!(stats.extent_count, 1);
    assert_eq!(stats.allocated_bytes, 0);
    assert_eq!(stats.live_allocations, 0);
    // A previous-session handle is only live again if the new session happens
    // to hand out the same address
    let fresh = mems.allocate(1).unwrap();
    assert_eq!(mems.is_valid(old), fresh == old);
}

#[test]
fn test_failed_init_leaves_manager_uninitialized() {
    let config = MemsConfig::default().with_initial_pages(4);
    let page = MemoryManager::new(MemsConfig::default()).unwrap().page_size();
    let mut mems = MemoryManager::new(config.with_max_mapped_bytes(page)).unwrap();

    assert!(matches!(
        mems.init(),
        Err(MemoryError::OutOfBackingMemory { .. })
    ));
    assert_eq!(mems.allocate(1), Err(MemoryError::UseBeforeInit));
}

#[test]
fn test_dropping_active_manager_does_not_leak_session() {
    let mut mems = MemoryManager::new(MemsConfig::default()).unwrap();
    mems.init().unwrap();
    mems.allocate(100).unwrap();
    drop(mems);
}
