/*!
 * Segment Storage Operations
 * Bounds-checked reads and writes into live allocations
 */

use super::{active, active_mut, MemoryManager};
use crate::core::types::{Handle, Size};
use crate::memory::types::{MemoryError, MemoryResult};
use log::debug;
use std::ptr;

impl MemoryManager {
    /// Copy `data` into a live allocation starting `offset` bytes in
    pub fn write_bytes(&mut self, handle: Handle, offset: Size, data: &[u8]) -> MemoryResult<()> {
        let session = active_mut(&mut self.state)?;
        let (base, segment) = session.live_segment(handle)?;
        check_bounds(handle, offset, data.len(), segment.size)?;

        // Safety: [handle + offset, handle + offset + len) lies inside an
        // allocated segment of a live mapping, and `&mut self` rules out any
        // concurrent access through this manager
        unsafe {
            ptr::copy_nonoverlapping(
                data.as_ptr(),
                base.as_ptr().add(segment.offset + offset),
                data.len(),
            );
        }

        debug!(
            "Wrote {} bytes to {} at offset {}",
            data.len(),
            handle,
            offset
        );
        Ok(())
    }

    /// Copy `len` bytes out of a live allocation starting `offset` bytes in
    pub fn read_bytes(&self, handle: Handle, offset: Size, len: Size) -> MemoryResult<Vec<u8>> {
        let session = active(&self.state)?;
        let (base, segment) = session.live_segment(handle)?;
        check_bounds(handle, offset, len, segment.size)?;

        let mut buffer = vec![0u8; len];
        // Safety: the source range is inside a live allocated segment (checked
        // above) and `buffer` is a distinct heap allocation of `len` bytes
        unsafe {
            ptr::copy_nonoverlapping(
                base.as_ptr().add(segment.offset + offset),
                buffer.as_mut_ptr(),
                len,
            );
        }

        debug!("Read {} bytes from {} at offset {}", len, handle, offset);
        Ok(buffer)
    }
}

fn check_bounds(handle: Handle, offset: Size, len: Size, size: Size) -> MemoryResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(MemoryError::OutOfBounds {
            handle,
            offset,
            len,
            size,
        }),
    }
}
