/*!
 * Allocation Directory
 * Append-only collection of extents, scanned in creation order
 */

use super::backing::Mapping;
use super::segment::{Segment, SegmentId, SegmentList};
use super::types::{ExtentStats, InvariantViolation, SegmentInfo, SegmentKind};
use crate::core::types::{Address, Size};

/// Index of an extent in creation order
pub type ExtentId = usize;

/// One region obtained from a single backing store request
#[derive(Debug)]
pub struct Extent {
    mapping: Mapping,
    segments: SegmentList,
}

impl Extent {
    /// Manage the first `size` bytes of `mapping` as one free segment
    pub fn new(mapping: Mapping, size: Size) -> Self {
        debug_assert!(size <= mapping.len());
        Self {
            segments: SegmentList::new(size.min(mapping.len())),
            mapping,
        }
    }

    pub fn base(&self) -> Address {
        self.mapping.address()
    }

    /// Bytes under management
    pub fn size(&self) -> Size {
        self.segments.total_size()
    }

    /// Bytes mapped from the OS (page-rounded)
    pub fn mapped_len(&self) -> Size {
        self.mapping.len()
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn segments(&self) -> &SegmentList {
        &self.segments
    }

    pub fn segments_mut(&mut self) -> &mut SegmentList {
        &mut self.segments
    }

    /// Whether `address` falls in the managed part of this extent
    pub fn contains(&self, address: Address) -> bool {
        address >= self.base() && address - self.base() < self.size()
    }

    /// Absolute address of a segment
    pub fn address_of(&self, segment: &Segment) -> Address {
        self.base() + segment.offset
    }

    pub fn into_mapping(self) -> Mapping {
        self.mapping
    }

    pub fn stats(&self) -> ExtentStats {
        let mut stats = ExtentStats {
            base: self.base(),
            size: self.size(),
            mapped_len: self.mapped_len(),
            segment_count: self.segments.len(),
            hole_count: 0,
            free_bytes: 0,
            allocated_bytes: 0,
            segments: Vec::with_capacity(self.segments.len()),
        };

        for (_, segment) in self.segments.iter() {
            match segment.kind {
                SegmentKind::Free => {
                    stats.hole_count += 1;
                    stats.free_bytes += segment.size;
                }
                SegmentKind::Allocated => stats.allocated_bytes += segment.size,
            }
            stats.segments.push(SegmentInfo {
                start: self.address_of(&segment),
                size: segment.size,
                kind: segment.kind,
            });
        }

        stats
    }

    pub fn verify(&self) -> Result<(), InvariantViolation> {
        self.segments.verify()?;
        if self.size() > self.mapped_len() {
            return Err(InvariantViolation::SizeMismatch {
                covered: self.size(),
                total: self.mapped_len(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Directory {
    extents: Vec<Extent>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.extents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extents.is_empty()
    }

    /// Append an extent at the tail
    pub fn push(&mut self, extent: Extent) -> ExtentId {
        self.extents.push(extent);
        self.extents.len() - 1
    }

    pub fn get(&self, id: ExtentId) -> Option<&Extent> {
        self.extents.get(id)
    }

    pub fn get_mut(&mut self, id: ExtentId) -> Option<&mut Extent> {
        self.extents.get_mut(id)
    }

    /// Extents in creation order
    pub fn iter(&self) -> impl Iterator<Item = (ExtentId, &Extent)> {
        self.extents.iter().enumerate()
    }

    /// First free segment of at least `size` bytes, in creation then address order
    pub fn first_fit(&self, size: Size) -> Option<(ExtentId, SegmentId)> {
        self.iter().find_map(|(extent_id, extent)| {
            extent
                .segments()
                .first_fit(size)
                .map(|segment_id| (extent_id, segment_id))
        })
    }

    /// Segment whose start address is exactly `address`
    pub fn find_segment(&self, address: Address) -> Option<(ExtentId, SegmentId)> {
        self.locate(address).and_then(|(extent_id, _)| {
            let extent = &self.extents[extent_id];
            extent
                .segments()
                .find_by_offset(address - extent.base())
                .map(|segment_id| (extent_id, segment_id))
        })
    }

    /// Segment whose range contains `address`
    pub fn find_containing(&self, address: Address) -> Option<(ExtentId, SegmentId)> {
        self.locate(address).and_then(|(extent_id, extent)| {
            extent
                .segments()
                .find_containing(address - extent.base())
                .map(|segment_id| (extent_id, segment_id))
        })
    }

    /// Remove every extent, oldest first
    pub fn drain(&mut self) -> impl Iterator<Item = Extent> + '_ {
        self.extents.drain(..)
    }

    fn locate(&self, address: Address) -> Option<(ExtentId, &Extent)> {
        self.iter().find(|(_, extent)| extent.contains(address))
    }
}
