/*!
 * Core Types
 * Common types used across the simulator
 */

use std::fmt;

/// Address type for memory operations
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;

/// Opaque token naming a live allocated segment
///
/// A handle is the start address of the segment it names. Callers should
/// treat it as opaque and go through [`MemoryManager::translate`] to obtain
/// a usable address.
///
/// [`MemoryManager::translate`]: crate::memory::MemoryManager::translate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(Address);

impl Handle {
    /// Rebuild a handle from a raw value previously obtained with [`Handle::raw`]
    pub const fn from_raw(raw: Address) -> Self {
        Self(raw)
    }

    /// Raw value of the handle
    pub const fn raw(self) -> Address {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<Handle> for Address {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

/// Round `value` up to the next multiple of `granularity` (a power of two)
///
/// Returns `None` on overflow.
#[inline]
pub const fn round_up(value: Size, granularity: Size) -> Option<Size> {
    debug_assert!(granularity.is_power_of_two());
    match value.checked_add(granularity - 1) {
        Some(v) => Some(v & !(granularity - 1)),
        None => None,
    }
}
