/*!
 * Anonymous Mapping Backing Store
 * Private read/write mappings through nix::sys::mman
 */

use super::Mapping;
use crate::core::limits::FALLBACK_PAGE_SIZE;
use crate::core::types::{round_up, Size};
use crate::memory::traits::BackingStore;
use crate::memory::types::BackingError;
use log::{debug, warn};
use nix::sys::mman::{mmap_anonymous, munmap, MapFlags, ProtFlags};
use nix::unistd::{sysconf, SysconfVar};
use std::num::NonZeroUsize;

/// Backing store handing out fresh anonymous mappings
#[derive(Debug, Clone)]
pub struct MmapBacking {
    page_size: Size,
}

impl MmapBacking {
    pub fn new() -> Self {
        Self {
            page_size: system_page_size(),
        }
    }
}

impl Default for MmapBacking {
    fn default() -> Self {
        Self::new()
    }
}

impl BackingStore for MmapBacking {
    fn page_size(&self) -> Size {
        self.page_size
    }

    fn acquire(&mut self, minimum_size: Size) -> Result<Mapping, BackingError> {
        let len = round_up(minimum_size.max(1), self.page_size)
            .ok_or(BackingError::SizeOverflow(minimum_size))?;
        let length = NonZeroUsize::new(len).ok_or(BackingError::SizeOverflow(minimum_size))?;

        // Safety: no fixed address is requested, so the kernel picks a fresh range
        // that aliases nothing else in the process
        let base = unsafe {
            mmap_anonymous(
                None,
                length,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_PRIVATE,
            )
        }
        .map_err(|errno| BackingError::AllocationFailed { len, errno })?;

        debug!("Mapped {} bytes at {:p}", len, base.as_ptr());

        // Safety: the kernel returned `len` readable/writable bytes at `base`
        Ok(unsafe { Mapping::from_raw_parts(base.cast(), len) })
    }

    fn release(&mut self, mapping: Mapping) -> Result<(), BackingError> {
        let base = mapping.address();
        let len = mapping.len();

        // Safety: the mapping came from `acquire` and is consumed here, so no
        // extent refers to it any more
        unsafe { munmap(mapping.base().cast(), len) }.map_err(|errno| {
            warn!("munmap of {} bytes at 0x{:x} failed: {}", len, base, errno);
            BackingError::ReleaseFailed { base, len, errno }
        })?;

        debug!("Unmapped {} bytes at 0x{:x}", len, base);
        Ok(())
    }
}

fn system_page_size() -> Size {
    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(size)) if size > 0 && (size as Size).is_power_of_two() => size as Size,
        _ => {
            warn!(
                "Could not query the page size, assuming {} bytes",
                FALLBACK_PAGE_SIZE
            );
            FALLBACK_PAGE_SIZE
        }
    }
}
