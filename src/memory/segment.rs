/*!
 * Segment List
 *
 * Ordered, doubly-linked sequence of address-contiguous segments covering one
 * extent. Nodes live in an arena and link to each other by slot index, so
 * splitting and merging never patch raw pointers.
 */

use super::types::{InvariantViolation, SegmentKind};
use crate::core::types::Size;

/// Stable index of a segment inside its list's arena
pub type SegmentId = usize;

/// Read-only view of one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Offset from the start of the extent
    pub offset: Size,
    pub size: Size,
    pub kind: SegmentKind,
}

impl Segment {
    pub fn end(&self) -> Size {
        self.offset + self.size
    }
}

#[derive(Debug, Clone)]
struct Node {
    segment: Segment,
    prev: Option<SegmentId>,
    next: Option<SegmentId>,
}

#[derive(Debug, Clone)]
pub struct SegmentList {
    slots: Vec<Option<Node>>,
    vacant: Vec<SegmentId>,
    head: SegmentId,
    tail: SegmentId,
    len: usize,
    total: Size,
}

impl SegmentList {
    /// A list holding one free segment spanning `total` bytes
    pub fn new(total: Size) -> Self {
        let node = Node {
            segment: Segment {
                offset: 0,
                size: total,
                kind: SegmentKind::Free,
            },
            prev: None,
            next: None,
        };
        Self {
            slots: vec![Some(node)],
            vacant: Vec::new(),
            head: 0,
            tail: 0,
            len: 1,
            total,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: a list covers its extent with at least one segment
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes covered by the list
    pub fn total_size(&self) -> Size {
        self.total
    }

    pub fn get(&self, id: SegmentId) -> Option<Segment> {
        self.node(id).map(|n| n.segment)
    }

    pub fn next(&self, id: SegmentId) -> Option<SegmentId> {
        self.node(id).and_then(|n| n.next)
    }

    pub fn prev(&self, id: SegmentId) -> Option<SegmentId> {
        self.node(id).and_then(|n| n.prev)
    }

    /// Segments in address order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: Some(self.head),
        }
    }

    /// First free segment of at least `size` bytes
    pub fn first_fit(&self, size: Size) -> Option<SegmentId> {
        self.iter()
            .find(|(_, seg)| seg.kind.is_free() && seg.size >= size)
            .map(|(id, _)| id)
    }

    /// Segment starting exactly at `offset`
    pub fn find_by_offset(&self, offset: Size) -> Option<SegmentId> {
        self.iter()
            .take_while(|(_, seg)| seg.offset <= offset)
            .find(|(_, seg)| seg.offset == offset)
            .map(|(id, _)| id)
    }

    /// Segment whose range contains `offset`
    pub fn find_containing(&self, offset: Size) -> Option<SegmentId> {
        self.iter()
            .take_while(|(_, seg)| seg.offset <= offset)
            .find(|(_, seg)| offset < seg.end())
            .map(|(id, _)| id)
    }

    pub fn set_kind(&mut self, id: SegmentId, kind: SegmentKind) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.segment.kind = kind;
                true
            }
            None => false,
        }
    }

    /// Shrink segment `id` to `size` bytes and insert the remainder right after it
    ///
    /// The remainder inherits the original kind. Returns the id of the new
    /// segment, or `None` when `size` is zero or does not leave a remainder.
    pub fn split(&mut self, id: SegmentId, size: Size) -> Option<SegmentId> {
        let (segment, next) = {
            let node = self.node(id)?;
            (node.segment, node.next)
        };
        if size == 0 || size >= segment.size {
            return None;
        }

        let remainder = Node {
            segment: Segment {
                offset: segment.offset + size,
                size: segment.size - size,
                kind: segment.kind,
            },
            prev: Some(id),
            next,
        };
        let new_id = self.insert_slot(remainder);

        if let Some(node) = self.node_mut(id) {
            node.segment.size = size;
            node.next = Some(new_id);
        }
        match next {
            Some(next_id) => {
                if let Some(node) = self.node_mut(next_id) {
                    node.prev = Some(new_id);
                }
            }
            None => self.tail = new_id,
        }
        self.len += 1;

        Some(new_id)
    }

    /// Absorb the successor of `id` into it, whatever their kinds
    ///
    /// Returns false when `id` has no successor.
    pub fn merge_next(&mut self, id: SegmentId) -> bool {
        let Some(next_id) = self.next(id) else {
            return false;
        };
        let Some(absorbed) = self.slots.get_mut(next_id).and_then(Option::take) else {
            return false;
        };
        self.vacant.push(next_id);

        if let Some(node) = self.node_mut(id) {
            node.segment.size += absorbed.segment.size;
            node.next = absorbed.next;
        }
        match absorbed.next {
            Some(after) => {
                if let Some(node) = self.node_mut(after) {
                    node.prev = Some(id);
                }
            }
            None => self.tail = id,
        }
        self.len -= 1;
        true
    }

    /// Merge free segment `id` with free neighbours on either side
    ///
    /// Returns the id of the surviving segment and how many merges happened.
    pub fn coalesce(&mut self, id: SegmentId) -> (SegmentId, usize) {
        let mut merges = 0;
        let is_free = |list: &Self, id: SegmentId| list.get(id).is_some_and(|s| s.kind.is_free());

        if !is_free(self, id) {
            return (id, 0);
        }

        if let Some(next_id) = self.next(id) {
            if is_free(self, next_id) && self.merge_next(id) {
                merges += 1;
            }
        }

        let mut survivor = id;
        if let Some(prev_id) = self.prev(id) {
            if is_free(self, prev_id) && self.merge_next(prev_id) {
                survivor = prev_id;
                merges += 1;
            }
        }

        (survivor, merges)
    }

    /// Check contiguity, ordering, link symmetry and size conservation
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        if self.len == 0 {
            return Err(InvariantViolation::Empty);
        }
        if self.node(self.head).and_then(|n| n.prev).is_some() {
            return Err(InvariantViolation::BrokenLink(self.head));
        }

        let mut expected_offset = 0;
        let mut walked = 0;
        let mut prev: Option<SegmentId> = None;
        let mut cursor = Some(self.head);

        while let Some(id) = cursor {
            let node = self.node(id).ok_or(InvariantViolation::BrokenLink(id))?;
            if node.prev != prev {
                return Err(InvariantViolation::BrokenLink(id));
            }
            if node.segment.size == 0 {
                return Err(InvariantViolation::ZeroSized {
                    offset: node.segment.offset,
                });
            }
            if node.segment.offset != expected_offset {
                return Err(InvariantViolation::Discontiguous {
                    expected: expected_offset,
                    found: node.segment.offset,
                });
            }

            expected_offset = node.segment.end();
            walked += 1;
            if walked > self.len {
                return Err(InvariantViolation::LengthMismatch {
                    recorded: self.len,
                    walked,
                });
            }
            prev = Some(id);
            cursor = node.next;
        }

        if prev != Some(self.tail) {
            return Err(InvariantViolation::BrokenLink(self.tail));
        }
        if walked != self.len {
            return Err(InvariantViolation::LengthMismatch {
                recorded: self.len,
                walked,
            });
        }
        if expected_offset != self.total {
            return Err(InvariantViolation::SizeMismatch {
                covered: expected_offset,
                total: self.total,
            });
        }
        Ok(())
    }

    fn node(&self, id: SegmentId) -> Option<&Node> {
        self.slots.get(id).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: SegmentId) -> Option<&mut Node> {
        self.slots.get_mut(id).and_then(Option::as_mut)
    }

    fn insert_slot(&mut self, node: Node) -> SegmentId {
        match self.vacant.pop() {
            Some(id) => {
                self.slots[id] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        }
    }
}

/// In-order iterator over `(id, segment)` pairs
pub struct Iter<'a> {
    list: &'a SegmentList,
    cursor: Option<SegmentId>,
}

impl Iterator for Iter<'_> {
    type Item = (SegmentId, Segment);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        let node = self.list.node(id)?;
        self.cursor = node.next;
        Some((id, node.segment))
    }
}
