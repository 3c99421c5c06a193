/*!
 * Memory Traits
 * Memory management abstractions
 */

use super::backing::Mapping;
use super::types::*;
use crate::core::types::{Address, Handle, Size};

/// Source of raw page-aligned extents
pub trait BackingStore: Send {
    /// Granularity of every mapping this store hands out
    fn page_size(&self) -> Size;

    /// Map at least `minimum_size` bytes; the returned length is page-rounded
    fn acquire(&mut self, minimum_size: Size) -> Result<Mapping, BackingError>;

    /// Return a mapping to the OS. Only called at session teardown.
    fn release(&mut self, mapping: Mapping) -> Result<(), BackingError>;
}

impl<B: BackingStore + ?Sized> BackingStore for Box<B> {
    fn page_size(&self) -> Size {
        (**self).page_size()
    }

    fn acquire(&mut self, minimum_size: Size) -> Result<Mapping, BackingError> {
        (**self).acquire(minimum_size)
    }

    fn release(&mut self, mapping: Mapping) -> Result<(), BackingError> {
        (**self).release(mapping)
    }
}

/// Allocator interface
pub trait Allocator {
    /// Allocate `size` bytes
    fn allocate(&mut self, size: Size) -> MemoryResult<Handle>;

    /// Release a live allocation
    fn release(&mut self, handle: Handle) -> MemoryResult<()>;

    /// Resolve a handle to its backing address
    fn translate(&self, handle: Handle) -> MemoryResult<Address>;
}

/// Memory statistics provider
pub trait MemoryInfo {
    /// Snapshot of the current session
    fn report(&self) -> MemoryResult<MemoryStats>;

    /// Get memory info as (managed, allocated, free)
    fn info(&self) -> MemoryResult<(Size, Size, Size)> {
        let stats = self.report()?;
        Ok((stats.managed_bytes, stats.allocated_bytes, stats.free_bytes))
    }
}
