/*!
 * Shared Memory Manager
 * Serializes every call to one session behind a mutex
 */

use super::MemoryManager;
use crate::core::types::{Address, Handle, Size};
use crate::memory::traits::{Allocator, MemoryInfo};
use crate::memory::types::{MemoryResult, MemoryStats};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable handle to a manager shared between threads
///
/// The engine itself takes no locks; this wrapper is the external
/// serialization a multi-threaded host needs.
#[derive(Clone)]
pub struct SharedMemoryManager {
    inner: Arc<Mutex<MemoryManager>>,
}

impl SharedMemoryManager {
    pub fn new(manager: MemoryManager) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    /// Run `f` with exclusive access to the manager
    pub fn with<R>(&self, f: impl FnOnce(&mut MemoryManager) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    pub fn init(&self) -> MemoryResult<()> {
        self.inner.lock().init()
    }

    pub fn finish(&self) -> MemoryResult<()> {
        self.inner.lock().finish()
    }

    pub fn allocate(&self, size: Size) -> MemoryResult<Handle> {
        self.inner.lock().allocate(size)
    }

    pub fn release(&self, handle: Handle) -> MemoryResult<()> {
        self.inner.lock().release(handle)
    }

    pub fn translate(&self, handle: Handle) -> MemoryResult<Address> {
        self.inner.lock().translate(handle)
    }

    pub fn report(&self) -> MemoryResult<MemoryStats> {
        self.inner.lock().report()
    }
}

impl Allocator for SharedMemoryManager {
    fn allocate(&mut self, size: Size) -> MemoryResult<Handle> {
        SharedMemoryManager::allocate(self, size)
    }

    fn release(&mut self, handle: Handle) -> MemoryResult<()> {
        SharedMemoryManager::release(self, handle)
    }

    fn translate(&self, handle: Handle) -> MemoryResult<Address> {
        SharedMemoryManager::translate(self, handle)
    }
}

impl MemoryInfo for SharedMemoryManager {
    fn report(&self) -> MemoryResult<MemoryStats> {
        SharedMemoryManager::report(self)
    }
}
