/*!
 * Memory Types
 * Errors, segment kinds and statistics snapshots
 */

use crate::core::types::{Address, Handle, Size};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Caller-facing errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum MemoryError {
    #[error("Invalid allocation size: {size} bytes")]
    #[diagnostic(
        code(mems::invalid_size),
        help("Allocation requests must be at least one byte.")
    )]
    InvalidSize { size: Size },

    #[error("Out of backing memory: could not map {requested} bytes")]
    #[diagnostic(
        code(mems::out_of_backing_memory),
        help("The backing store refused a new extent. Release allocations or raise the mapping budget.")
    )]
    OutOfBackingMemory {
        requested: Size,
        #[source]
        source: BackingError,
    },

    #[error("Unknown handle {0}: not a live allocation")]
    #[diagnostic(
        code(mems::unknown_handle),
        help("The handle was never returned by allocate, or it was already released.")
    )]
    UnknownHandle(Handle),

    #[error("Access of {len} bytes at offset {offset} is outside allocation {handle} ({size} bytes)")]
    #[diagnostic(code(mems::out_of_bounds))]
    OutOfBounds {
        handle: Handle,
        offset: Size,
        len: Size,
        size: Size,
    },

    #[error("Session used before init")]
    #[diagnostic(code(mems::use_before_init), help("Call init() first."))]
    UseBeforeInit,

    #[error("Session used after finish")]
    #[diagnostic(
        code(mems::use_after_finish),
        help("All handles were invalidated by finish(). Call init() to start a new session.")
    )]
    UseAfterFinish,

    #[error("Session already initialized")]
    #[diagnostic(code(mems::already_initialized))]
    AlreadyInitialized,

    #[error("Backing store failed during teardown: {0}")]
    #[diagnostic(code(mems::teardown_failed))]
    TeardownFailed(#[source] BackingError),

    #[error("Invalid configuration for {key}: {reason}")]
    #[diagnostic(code(mems::invalid_config))]
    InvalidConfig { key: &'static str, reason: String },
}

/// Backing store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackingError {
    #[error("mmap of {len} bytes failed: {errno}")]
    AllocationFailed { len: Size, errno: nix::errno::Errno },

    #[error("mapping budget exhausted: {requested} bytes requested, {mapped} of {limit} bytes mapped")]
    BudgetExhausted {
        requested: Size,
        mapped: Size,
        limit: Size,
    },

    #[error("request of {0} bytes cannot be rounded to whole pages")]
    SizeOverflow(Size),

    #[error("munmap of {len} bytes at 0x{base:x} failed: {errno}")]
    ReleaseFailed {
        base: Address,
        len: Size,
        errno: nix::errno::Errno,
    },
}

/// Bookkeeping corruption detected inside one extent
///
/// Not a caller error: the engine panics when it sees one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("segment list is empty")]
    Empty,

    #[error("segment at offset {offset} has zero size")]
    ZeroSized { offset: Size },

    #[error("gap or overlap: segment starts at {found}, expected {expected}")]
    Discontiguous { expected: Size, found: Size },

    #[error("segments cover {covered} bytes of a {total}-byte extent")]
    SizeMismatch { covered: Size, total: Size },

    #[error("broken link around slot {0}")]
    BrokenLink(usize),

    #[error("list length {recorded} disagrees with {walked} reachable segments")]
    LengthMismatch { recorded: usize, walked: usize },

    #[error("{what}: counter says {recorded}, traversal says {actual}")]
    CounterMismatch {
        what: &'static str,
        recorded: Size,
        actual: Size,
    },
}

/// Segment state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Available for reuse (a "hole")
    Free,
    /// Owned by a caller (a "process" segment)
    Allocated,
}

impl SegmentKind {
    pub fn is_free(self) -> bool {
        self == Self::Free
    }

    /// Single-letter tag used by the text report
    pub fn tag(self) -> char {
        match self {
            Self::Free => 'H',
            Self::Allocated => 'P',
        }
    }
}

/// One segment as seen by the stats snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentInfo {
    pub start: Address,
    pub size: Size,
    pub kind: SegmentKind,
}

impl SegmentInfo {
    /// Last byte covered by the segment
    pub fn end(&self) -> Address {
        self.start + self.size - 1
    }
}

/// Per-extent statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtentStats {
    pub base: Address,
    /// Bytes under management (sum of segment sizes)
    pub size: Size,
    /// Bytes actually mapped from the OS
    pub mapped_len: Size,
    pub segment_count: usize,
    pub hole_count: usize,
    pub free_bytes: Size,
    pub allocated_bytes: Size,
    pub segments: Vec<SegmentInfo>,
}

/// Session-wide statistics snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub page_size: Size,
    pub extent_count: usize,
    pub mapped_pages: usize,
    pub mapped_bytes: Size,
    pub managed_bytes: Size,
    pub free_bytes: Size,
    pub allocated_bytes: Size,
    pub live_allocations: usize,
    pub extents: Vec<ExtentStats>,
}

impl MemoryStats {
    /// Number of segments in each extent, in creation order
    pub fn segment_list_lengths(&self) -> Vec<usize> {
        self.extents.iter().map(|e| e.segment_count).collect()
    }

    /// Number of free segments in each extent, in creation order
    pub fn hole_counts(&self) -> Vec<usize> {
        self.extents.iter().map(|e| e.hole_count).collect()
    }

    /// Fraction of managed bytes currently allocated
    pub fn utilization(&self) -> f64 {
        if self.managed_bytes == 0 {
            0.0
        } else {
            self.allocated_bytes as f64 / self.managed_bytes as f64
        }
    }
}
