/*!
 * MeMS Simulator Library
 * First-fit virtual memory allocator over anonymous OS mappings
 */

pub mod core;
pub mod memory;
pub mod monitoring;

// Re-exports
pub use crate::core::{Address, ExtentPolicy, Handle, MemsConfig, Size};
pub use crate::memory::{
    Allocator, MemoryError, MemoryInfo, MemoryManager, MemoryResult, MemoryStats,
    SharedMemoryManager,
};
pub use crate::monitoring::init_tracing;
