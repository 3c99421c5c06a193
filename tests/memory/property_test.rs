/*!
 * Property Tests
 * Random allocate/release workloads against the accounting invariants
 */

use mems::{Handle, MemoryManager, MemsConfig};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Allocate(usize),
    /// Release the n-th live handle (modulo the live count)
    Release(usize),
    /// Release something that was never handed out
    ReleaseBogus(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        5 => (1usize..6000).prop_map(Op::Allocate),
        3 => any::<usize>().prop_map(Op::Release),
        1 => (1usize..4096).prop_map(Op::ReleaseBogus),
    ]
}

fn config() -> impl Strategy<Value = MemsConfig> {
    prop_oneof![
        Just(MemsConfig::default()),
        Just(MemsConfig::exact()),
        Just(MemsConfig::default().with_coalescing(true)),
        Just(MemsConfig::exact().with_coalescing(true)),
        (0usize..4).prop_map(|pages| MemsConfig::default().with_initial_pages(pages)),
    ]
}

fn run(config: MemsConfig, ops: Vec<Op>) -> Result<(), TestCaseError> {
    let mut mems = MemoryManager::new(config).unwrap();
    mems.init().unwrap();
    let mut live: Vec<(Handle, usize)> = Vec::new();

    for op in ops {
        match op {
            Op::Allocate(size) => {
                let handle = mems.allocate(size).unwrap();
                prop_assert_eq!(mems.allocation_size(handle).unwrap(), size);
                live.push((handle, size));
            }
            Op::Release(n) if !live.is_empty() => {
                let (handle, _) = live.swap_remove(n % live.len());
                prop_assert!(mems.release(handle).is_ok());
                prop_assert!(!mems.is_valid(handle));
            }
            Op::Release(_) => {}
            Op::ReleaseBogus(offset) => {
                // An address strictly inside a live allocation is never a handle
                if let Some(&(handle, size)) = live.iter().find(|(_, size)| *size > offset) {
                    let inner = Handle::from_raw(handle.raw() + offset);
                    prop_assert!(mems.release(inner).is_err());
                    prop_assert!(mems.allocation_size(handle).unwrap() == size);
                }
            }
        }

        mems.check_invariants().unwrap();
        let stats = mems.report().unwrap();
        prop_assert_eq!(stats.allocated_bytes + stats.free_bytes, stats.managed_bytes);
        prop_assert_eq!(stats.live_allocations, live.len());
        prop_assert_eq!(
            stats.allocated_bytes,
            live.iter().map(|(_, size)| size).sum::<usize>()
        );
    }

    let mut ranges: Vec<(usize, usize)> = live
        .iter()
        .map(|(handle, size)| (handle.raw(), handle.raw() + size))
        .collect();
    ranges.sort();
    for pair in ranges.windows(2) {
        prop_assert!(pair[0].1 <= pair[1].0);
    }

    mems.finish().unwrap();
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_accounting_holds_under_random_workloads(
        config in config(),
        ops in prop::collection::vec(op(), 1..80),
    ) {
        run(config, ops)?;
    }

    #[test]
    fn prop_release_then_allocate_same_size_reuses_address(
        sizes in prop::collection::vec(1usize..3000, 1..20),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut mems = MemoryManager::new(MemsConfig::default()).unwrap();
        mems.init().unwrap();

        let handles: Vec<Handle> = sizes.iter().map(|&s| mems.allocate(s).unwrap()).collect();
        let i = pick.index(handles.len());
        mems.release(handles[i]).unwrap();

        // Every earlier hole is at least as small as it was before, so the
        // freed segment is the first one to fit again
        prop_assert_eq!(mems.allocate(sizes[i]).unwrap(), handles[i]);
    }
}
