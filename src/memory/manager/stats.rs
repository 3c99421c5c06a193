/*!
 * Stats Collector
 * Read-only snapshots of the directory and their text rendering
 */

use super::{active, MemoryManager};
use crate::memory::types::{MemoryResult, MemoryStats};
use std::fmt;

impl MemoryManager {
    /// Snapshot of every extent and segment in the session
    pub fn report(&self) -> MemoryResult<MemoryStats> {
        let session = active(&self.state)?;
        let page_size = self.backing.page_size();

        let extents: Vec<_> = session
            .directory
            .iter()
            .map(|(_, extent)| extent.stats())
            .collect();

        let mapped_bytes: usize = extents.iter().map(|e| e.mapped_len).sum();
        let stats = MemoryStats {
            page_size,
            extent_count: extents.len(),
            mapped_pages: mapped_bytes / page_size,
            mapped_bytes,
            managed_bytes: extents.iter().map(|e| e.size).sum(),
            free_bytes: extents.iter().map(|e| e.free_bytes).sum(),
            allocated_bytes: extents.iter().map(|e| e.allocated_bytes).sum(),
            live_allocations: extents
                .iter()
                .map(|e| e.segment_count - e.hole_count)
                .sum(),
            extents,
        };
        Ok(stats)
    }
}

impl MemoryStats {
    /// Render the snapshot as JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// The classic MeMS report: one line per extent, then the totals
impl fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MEMS SYSTEM STATS")?;
        for extent in &self.extents {
            let end = extent.base + extent.size.saturating_sub(1);
            write!(f, "MAIN [{}:{}]-> ", extent.base, end)?;
            for segment in &extent.segments {
                write!(
                    f,
                    "{}[{}:{}] <-> ",
                    segment.kind.tag(),
                    segment.start,
                    segment.end()
                )?;
            }
            writeln!(f, "NULL")?;
        }

        writeln!(f, "Pages used:\t{}", self.mapped_pages)?;
        writeln!(f, "Space unused:\t{}", self.free_bytes)?;
        writeln!(f, "Main Chain Length:\t{}", self.extent_count)?;
        let holes: Vec<String> = self.hole_counts().iter().map(usize::to_string).collect();
        write!(f, "Sub-chain Length array: [{}]", holes.join(", "))
    }
}
