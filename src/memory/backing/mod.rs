/*!
 * Backing Store
 * Page-aligned extents obtained from the operating system
 */

mod limited;
mod mmap;

pub use limited::LimitedBacking;
pub use mmap::MmapBacking;

use crate::core::types::{Address, Size};
use std::ptr::NonNull;

/// One live OS mapping
///
/// Not `Clone`: releasing consumes the mapping, so it cannot be returned twice.
#[derive(Debug, PartialEq, Eq)]
pub struct Mapping {
    base: NonNull<u8>,
    len: Size,
}

// Safety: a Mapping is the sole owner of its region; nothing else aliases it
unsafe impl Send for Mapping {}

impl Mapping {
    /// Wrap a region obtained from the OS
    ///
    /// # Safety
    ///
    /// `base` must point to `len` readable and writable bytes that stay valid
    /// until the mapping is handed back to the store that produced it.
    pub unsafe fn from_raw_parts(base: NonNull<u8>, len: Size) -> Self {
        Self { base, len }
    }

    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    pub fn address(&self) -> Address {
        self.base.as_ptr() as Address
    }

    pub fn len(&self) -> Size {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
