/*!
 * Memory Allocator Implementation
 * First-fit allocation and release logic
 */

use super::{active_mut, MemoryManager, Session};
use crate::core::types::{Address, Handle, Size};
use crate::memory::directory::ExtentId;
use crate::memory::segment::SegmentId;
use crate::memory::types::{MemoryError, MemoryResult, SegmentKind};
use log::{debug, info, warn};

impl MemoryManager {
    /// Allocate `size` bytes from the first free segment large enough
    ///
    /// Extents are scanned in creation order and segments in address order.
    /// A larger segment is split; its front becomes the allocation. When no
    /// segment fits, a new extent is mapped and the allocation is carved from
    /// it.
    pub fn allocate(&mut self, size: Size) -> MemoryResult<Handle> {
        let session = active_mut(&mut self.state)?;
        if size == 0 {
            warn!("Rejected allocation of 0 bytes");
            return Err(MemoryError::InvalidSize { size });
        }

        let (extent_id, segment_id) = match session.directory.first_fit(size) {
            Some(found) => found,
            None => {
                debug!("No free segment holds {} bytes, growing directory", size);
                let extent_id =
                    session.grow(self.backing.as_mut(), size, self.config.extent_policy)?;
                let segment_id = session
                    .directory
                    .get(extent_id)
                    .and_then(|extent| extent.segments().first_fit(size));
                match segment_id {
                    Some(segment_id) => (extent_id, segment_id),
                    None => panic!(
                        "freshly mapped extent #{} cannot hold {} bytes",
                        extent_id, size
                    ),
                }
            }
        };

        let handle = session.claim(extent_id, segment_id, size);
        info!(
            "Allocated {} bytes at {} (extent #{}, {} bytes free)",
            size, handle, extent_id, session.counters.free_bytes
        );
        Ok(handle)
    }

    /// Release a live allocation
    ///
    /// Unknown handles and handles already released fail with
    /// `UnknownHandle` and leave the session untouched.
    pub fn release(&mut self, handle: Handle) -> MemoryResult<()> {
        let coalesce = self.config.coalesce;
        let session = active_mut(&mut self.state)?;

        let Some((extent_id, segment_id)) = session.directory.find_segment(handle.raw()) else {
            match session.containing_segment(handle) {
                Some((start, kind)) => warn!(
                    "Attempted to release interior address {} of {:?} segment at 0x{:x}",
                    handle, kind, start
                ),
                None => warn!("Attempted to release unknown address {}", handle),
            }
            return Err(MemoryError::UnknownHandle(handle));
        };

        let size = match session.segment(extent_id, segment_id) {
            Some((SegmentKind::Allocated, size)) => size,
            _ => {
                warn!("Attempted to release already freed address {}", handle);
                return Err(MemoryError::UnknownHandle(handle));
            }
        };

        session.vacate(extent_id, segment_id, size, coalesce);
        info!(
            "Released {} bytes at {} ({} bytes now free)",
            size, handle, session.counters.free_bytes
        );
        Ok(())
    }
}

impl Session {
    fn segment(&self, extent_id: ExtentId, segment_id: SegmentId) -> Option<(SegmentKind, Size)> {
        self.directory
            .get(extent_id)
            .and_then(|extent| extent.segments().get(segment_id))
            .map(|segment| (segment.kind, segment.size))
    }

    /// Start and kind of the segment an arbitrary address falls into
    pub(super) fn containing_segment(&self, handle: Handle) -> Option<(Address, SegmentKind)> {
        let (extent_id, segment_id) = self.directory.find_containing(handle.raw())?;
        let extent = self.directory.get(extent_id)?;
        let segment = extent.segments().get(segment_id)?;
        Some((extent.address_of(&segment), segment.kind))
    }

    /// Turn the front `size` bytes of a free segment into an allocation
    pub(super) fn claim(
        &mut self,
        extent_id: ExtentId,
        segment_id: SegmentId,
        size: Size,
    ) -> Handle {
        let Some(extent) = self.directory.get_mut(extent_id) else {
            panic!("extent #{} vanished during allocation", extent_id);
        };
        let segments = extent.segments_mut();

        if let Some(remainder) = segments.split(segment_id, size) {
            debug!(
                "Split segment in extent #{}: {} bytes allocated, {} bytes left free",
                extent_id,
                size,
                segments.get(remainder).map_or(0, |s| s.size)
            );
        }
        segments.set_kind(segment_id, SegmentKind::Allocated);

        let handle = match segments.get(segment_id) {
            Some(segment) => Handle::from_raw(extent.address_of(&segment)),
            None => panic!("segment vanished from extent #{}", extent_id),
        };

        self.counters.free_bytes -= size;
        self.counters.allocated_bytes += size;
        self.counters.live_allocations += 1;
        self.assert_extent(extent_id);
        handle
    }

    /// Mark an allocated segment free, optionally merging free neighbours
    pub(super) fn vacate(
        &mut self,
        extent_id: ExtentId,
        segment_id: SegmentId,
        size: Size,
        coalesce: bool,
    ) {
        let Some(extent) = self.directory.get_mut(extent_id) else {
            panic!("extent #{} vanished during release", extent_id);
        };
        let segments = extent.segments_mut();
        segments.set_kind(segment_id, SegmentKind::Free);

        if coalesce {
            let (_, merges) = segments.coalesce(segment_id);
            if merges > 0 {
                debug!(
                    "Coalesced {} neighbouring holes in extent #{} ({} segments remain)",
                    merges,
                    extent_id,
                    segments.len()
                );
            }
        }

        self.counters.allocated_bytes -= size;
        self.counters.free_bytes += size;
        self.counters.live_allocations -= 1;
        self.assert_extent(extent_id);
    }
}
