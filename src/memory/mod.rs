/*!
 * Memory Module
 * Backing store, segment bookkeeping and the session allocator
 */

pub mod backing;
pub mod directory;
pub mod manager;
pub mod segment;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use backing::{LimitedBacking, Mapping, MmapBacking};
pub use manager::{MemoryManager, SharedMemoryManager};
pub use traits::*;
pub use types::*;
