/*!
 * Core Module
 * Shared types, limits and configuration
 */

pub mod config;
pub mod limits;
pub mod types;

pub use config::{ExtentPolicy, MemsConfig};
pub use types::{Address, Handle, Size};
