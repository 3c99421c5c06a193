/*!
 * Address Resolver
 *
 * Handles are identity-mapped: the handle already is the backing address in
 * this flat-space simulation. There is no page table and no fault path;
 * translation only checks that the handle names a live allocation.
 */

use super::{active, MemoryManager, Session};
use crate::core::types::{Address, Handle, Size};
use crate::memory::segment::Segment;
use crate::memory::types::{MemoryError, MemoryResult, SegmentKind};
use std::ptr::NonNull;

impl MemoryManager {
    /// Backing address of a live allocation
    pub fn translate(&self, handle: Handle) -> MemoryResult<Address> {
        let session = active(&self.state)?;
        session.live_segment(handle)?;
        Ok(handle.raw())
    }

    /// Backing address `offset` bytes into a live allocation
    pub fn translate_offset(&self, handle: Handle, offset: Size) -> MemoryResult<Address> {
        let session = active(&self.state)?;
        let (_, segment) = session.live_segment(handle)?;
        if offset >= segment.size {
            return Err(MemoryError::OutOfBounds {
                handle,
                offset,
                len: 1,
                size: segment.size,
            });
        }
        Ok(handle.raw() + offset)
    }

    /// Size of a live allocation
    pub fn allocation_size(&self, handle: Handle) -> MemoryResult<Size> {
        let session = active(&self.state)?;
        session.live_segment(handle).map(|(_, segment)| segment.size)
    }

    /// Check if a handle names a live allocation
    pub fn is_valid(&self, handle: Handle) -> bool {
        active(&self.state)
            .and_then(|session| session.live_segment(handle))
            .is_ok()
    }
}

impl Session {
    /// Allocated segment starting at `handle`, with the base of its mapping
    pub(super) fn live_segment(&self, handle: Handle) -> MemoryResult<(NonNull<u8>, Segment)> {
        self.directory
            .find_segment(handle.raw())
            .and_then(|(extent_id, segment_id)| {
                let extent = self.directory.get(extent_id)?;
                let segment = extent.segments().get(segment_id)?;
                Some((extent.mapping().base(), segment))
            })
            .filter(|(_, segment)| segment.kind == SegmentKind::Allocated)
            .ok_or(MemoryError::UnknownHandle(handle))
    }
}
