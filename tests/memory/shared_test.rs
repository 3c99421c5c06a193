/*!
 * Shared Manager Tests
 * One session driven from several threads, and use through the traits
 */

use mems::{Allocator, Handle, MemoryInfo, MemoryManager, MemsConfig, SharedMemoryManager};
use pretty_assertions::assert_eq;
use std::thread;

fn shared() -> SharedMemoryManager {
    let shared = SharedMemoryManager::new(MemoryManager::new(MemsConfig::default()).unwrap());
    shared.init().unwrap();
    shared
}

#[test]
fn test_concurrent_allocations_are_disjoint() {
    let mems = shared();

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let mems = mems.clone();
            thread::spawn(move || {
                (0..25)
                    .map(|i| {
                        let size = 16 + worker * 100 + i;
                        (mems.allocate(size).unwrap(), size)
                    })
                    .collect::<Vec<(Handle, usize)>>()
            })
        })
        .collect();

    let mut ranges: Vec<(usize, usize)> = workers
        .into_iter()
        .flat_map(|w| w.join().unwrap())
        .map(|(handle, size)| (handle.raw(), handle.raw() + size))
        .collect();
    ranges.sort();

    assert_eq!(ranges.len(), 100);
    for pair in ranges.windows(2) {
        assert!(pair[0].1 <= pair[1].0);
    }

    let stats = mems.report().unwrap();
    assert_eq!(stats.live_allocations, 100);
    mems.with(|manager| manager.check_invariants()).unwrap();
}

#[test]
fn test_concurrent_churn_keeps_accounting() {
    let mems = shared();

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let mems = mems.clone();
            thread::spawn(move || {
                for round in 0..50 {
                    let handle = mems.allocate(1 + worker * 7 + round).unwrap();
                    mems.release(handle).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let stats = mems.report().unwrap();
    assert_eq!(stats.allocated_bytes, 0);
    assert_eq!(stats.free_bytes, stats.managed_bytes);
    mems.finish().unwrap();
}

/// Exercise any allocator through the trait seam
fn churn<A: Allocator + MemoryInfo>(allocator: &mut A) -> (usize, usize, usize) {
    let a = allocator.allocate(100).unwrap();
    let _kept = allocator.allocate(200).unwrap();
    assert_eq!(allocator.translate(a).unwrap(), a.raw());
    allocator.release(a).unwrap();
    assert!(allocator.release(a).is_err());
    allocator.info().unwrap()
}

#[test]
fn test_trait_objects_agree() {
    let mut plain = MemoryManager::new(MemsConfig::default()).unwrap();
    plain.init().unwrap();
    let mut wrapped = shared();

    let (managed, allocated, free) = churn(&mut plain);
    assert_eq!(allocated, 200);
    assert_eq!(managed, allocated + free);

    assert_eq!(churn(&mut wrapped), (managed, allocated, free));
}
