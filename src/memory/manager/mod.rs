/*!
 * Memory Management
 *
 * Session-scoped first-fit allocator over anonymous OS mappings.
 *
 * ## Structure
 *
 * - **Directory**: extents in creation order, each obtained from one backing
 *   store request
 * - **Segment lists**: per-extent ordered runs of free ("hole") and allocated
 *   ("process") segments that always tile the extent exactly
 *
 * ## Lifecycle
 *
 * A [`MemoryManager`] starts uninitialized. `init` maps the initial extent,
 * `finish` returns every extent to the OS and invalidates all handles. Any
 * other call outside an active session fails with `UseBeforeInit` or
 * `UseAfterFinish`. A finished manager may be initialized again.
 *
 * The engine is single-threaded; wrap it in [`SharedMemoryManager`] to share
 * a session between threads.
 */

mod allocator;
mod resolver;
mod shared;
mod stats;
mod storage;

pub use shared::SharedMemoryManager;

use super::backing::{LimitedBacking, MmapBacking};
use super::directory::{Directory, Extent, ExtentId};
use super::traits::{Allocator, BackingStore, MemoryInfo};
use super::types::{BackingError, InvariantViolation, MemoryError, MemoryResult, MemoryStats};
use crate::core::config::{ExtentPolicy, MemsConfig};
use crate::core::types::{round_up, Address, Handle, Size};
use log::{info, warn};

/// Aggregate counters kept alongside the directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct Counters {
    pub mapped_bytes: Size,
    pub managed_bytes: Size,
    pub free_bytes: Size,
    pub allocated_bytes: Size,
    pub live_allocations: usize,
}

/// State owned by one init/finish bracket
#[derive(Debug, Default)]
pub(super) struct Session {
    pub directory: Directory,
    pub counters: Counters,
}

impl Session {
    /// Map a new extent able to hold `size` bytes and append it to the directory
    pub fn grow(
        &mut self,
        backing: &mut dyn BackingStore,
        size: Size,
        policy: ExtentPolicy,
    ) -> MemoryResult<ExtentId> {
        let page_size = backing.page_size();
        let out_of_memory = |source| MemoryError::OutOfBackingMemory {
            requested: size,
            source,
        };

        let request = round_up(size, page_size)
            .ok_or(out_of_memory(BackingError::SizeOverflow(size)))?;
        let mapping = backing.acquire(request).map_err(out_of_memory)?;

        let managed = match policy {
            ExtentPolicy::PageRounded => mapping.len(),
            ExtentPolicy::Exact => size,
        };
        let mapped = mapping.len();
        let extent = Extent::new(mapping, managed);
        let base = extent.base();
        let id = self.directory.push(extent);

        self.counters.mapped_bytes += mapped;
        self.counters.managed_bytes += managed;
        self.counters.free_bytes += managed;

        info!(
            "Mapped extent #{} at 0x{:x}: {} bytes managed, {} bytes mapped ({:?})",
            id, base, managed, mapped, policy
        );
        Ok(id)
    }

    /// Verify one extent after a mutation; corruption aborts
    pub fn assert_extent(&self, id: ExtentId) {
        if let Some(extent) = self.directory.get(id) {
            if let Err(violation) = extent.verify() {
                corrupted(id, &violation);
            }
        }
    }

    /// Full consistency check: every extent plus counter agreement
    pub fn check(&self) -> Result<(), (Option<ExtentId>, InvariantViolation)> {
        let mut actual = Counters::default();

        for (id, extent) in self.directory.iter() {
            extent.verify().map_err(|v| (Some(id), v))?;
            let stats = extent.stats();
            actual.mapped_bytes += stats.mapped_len;
            actual.managed_bytes += stats.size;
            actual.free_bytes += stats.free_bytes;
            actual.allocated_bytes += stats.allocated_bytes;
            actual.live_allocations += stats.segment_count - stats.hole_count;
        }

        let pairs = [
            ("mapped bytes", self.counters.mapped_bytes, actual.mapped_bytes),
            ("managed bytes", self.counters.managed_bytes, actual.managed_bytes),
            ("free bytes", self.counters.free_bytes, actual.free_bytes),
            ("allocated bytes", self.counters.allocated_bytes, actual.allocated_bytes),
            ("live allocations", self.counters.live_allocations, actual.live_allocations),
            (
                "allocated + free",
                self.counters.managed_bytes,
                actual.allocated_bytes + actual.free_bytes,
            ),
        ];
        for (what, recorded, actual) in pairs {
            if recorded != actual {
                return Err((
                    None,
                    InvariantViolation::CounterMismatch {
                        what,
                        recorded,
                        actual,
                    },
                ));
            }
        }
        Ok(())
    }
}

#[cold]
fn corrupted(id: ExtentId, violation: &InvariantViolation) -> ! {
    panic!("allocator bookkeeping corrupted in extent #{}: {}", id, violation)
}

#[derive(Debug)]
enum Lifecycle {
    Uninitialized,
    Active(Session),
    Finished,
}

/// Active session or the lifecycle error explaining why there is none
fn active(state: &Lifecycle) -> MemoryResult<&Session> {
    match state {
        Lifecycle::Active(session) => Ok(session),
        Lifecycle::Uninitialized => Err(MemoryError::UseBeforeInit),
        Lifecycle::Finished => Err(MemoryError::UseAfterFinish),
    }
}

fn active_mut(state: &mut Lifecycle) -> MemoryResult<&mut Session> {
    match state {
        Lifecycle::Active(session) => Ok(session),
        Lifecycle::Uninitialized => Err(MemoryError::UseBeforeInit),
        Lifecycle::Finished => Err(MemoryError::UseAfterFinish),
    }
}

/// Memory manager
pub struct MemoryManager {
    config: MemsConfig,
    backing: Box<dyn BackingStore>,
    state: Lifecycle,
}

impl MemoryManager {
    /// Manager over anonymous mappings, honouring the configured budget
    pub fn new(config: MemsConfig) -> MemoryResult<Self> {
        config.validate()?;
        let backing: Box<dyn BackingStore> = match config.max_mapped_bytes {
            Some(limit) => Box::new(LimitedBacking::new(MmapBacking::new(), limit)),
            None => Box::new(MmapBacking::new()),
        };
        Ok(Self::from_parts(config, backing))
    }

    /// Manager with a caller-supplied backing store
    pub fn with_backing<B>(config: MemsConfig, backing: B) -> MemoryResult<Self>
    where
        B: BackingStore + 'static,
    {
        config.validate()?;
        Ok(Self::from_parts(config, Box::new(backing)))
    }

    fn from_parts(config: MemsConfig, backing: Box<dyn BackingStore>) -> Self {
        Self {
            config,
            backing,
            state: Lifecycle::Uninitialized,
        }
    }

    pub fn config(&self) -> &MemsConfig {
        &self.config
    }

    pub fn page_size(&self) -> Size {
        self.backing.page_size()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, Lifecycle::Active(_))
    }

    /// Start a session and map the initial extent
    pub fn init(&mut self) -> MemoryResult<()> {
        if self.is_active() {
            warn!("init called on an active session");
            return Err(MemoryError::AlreadyInitialized);
        }

        let mut session = Session::default();
        if self.config.initial_pages > 0 {
            let bytes = self.config.initial_pages * self.backing.page_size();
            // The initial reservation always spans its whole mapping
            session.grow(self.backing.as_mut(), bytes, ExtentPolicy::PageRounded)?;
        }

        info!(
            "MeMS session initialized ({} initial pages, {:?} extents, coalescing {})",
            self.config.initial_pages,
            self.config.extent_policy,
            if self.config.coalesce { "on" } else { "off" }
        );
        self.state = Lifecycle::Active(session);
        Ok(())
    }

    /// End the session, returning every extent to the OS
    ///
    /// All extents are released even if one of them fails; the first failure
    /// is reported. The manager is finished either way.
    pub fn finish(&mut self) -> MemoryResult<()> {
        let mut session = match std::mem::replace(&mut self.state, Lifecycle::Finished) {
            Lifecycle::Active(session) => session,
            Lifecycle::Uninitialized => {
                self.state = Lifecycle::Uninitialized;
                return Err(MemoryError::UseBeforeInit);
            }
            Lifecycle::Finished => return Err(MemoryError::UseAfterFinish),
        };

        let extents = session.directory.len();
        let outstanding = session.counters.live_allocations;
        let first_error = release_all(self.backing.as_mut(), &mut session.directory);

        if outstanding > 0 {
            warn!(
                "MeMS session finished with {} live allocations ({} bytes) outstanding",
                outstanding, session.counters.allocated_bytes
            );
        }
        info!(
            "MeMS session finished: unmapped {} extents ({} bytes)",
            extents, session.counters.mapped_bytes
        );

        match first_error {
            Some(source) => Err(MemoryError::TeardownFailed(source)),
            None => Ok(()),
        }
    }

    /// Run the full bookkeeping consistency check
    ///
    /// Panics on corruption, like every mutating operation does for the extent
    /// it touched.
    pub fn check_invariants(&self) -> MemoryResult<()> {
        let session = active(&self.state)?;
        match session.check() {
            Ok(()) => Ok(()),
            Err((Some(id), violation)) => corrupted(id, &violation),
            Err((None, violation)) => {
                panic!("allocator bookkeeping corrupted: {}", violation)
            }
        }
    }
}

fn release_all(
    backing: &mut dyn BackingStore,
    directory: &mut Directory,
) -> Option<BackingError> {
    let mut first_error = None;
    for extent in directory.drain() {
        if let Err(e) = backing.release(extent.into_mapping()) {
            first_error.get_or_insert(e);
        }
    }
    first_error
}

impl Drop for MemoryManager {
    fn drop(&mut self) {
        if let Lifecycle::Active(session) = &mut self.state {
            warn!(
                "MemoryManager dropped without finish; unmapping {} extents",
                session.directory.len()
            );
            release_all(self.backing.as_mut(), &mut session.directory);
        }
    }
}

impl std::fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

// Implement trait interfaces
impl Allocator for MemoryManager {
    fn allocate(&mut self, size: Size) -> MemoryResult<Handle> {
        MemoryManager::allocate(self, size)
    }

    fn release(&mut self, handle: Handle) -> MemoryResult<()> {
        MemoryManager::release(self, handle)
    }

    fn translate(&self, handle: Handle) -> MemoryResult<Address> {
        MemoryManager::translate(self, handle)
    }
}

impl MemoryInfo for MemoryManager {
    fn report(&self) -> MemoryResult<MemoryStats> {
        MemoryManager::report(self)
    }
}
