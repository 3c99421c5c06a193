/*!
 * System Limits and Constants
 *
 * Central place for defaults, bounds and environment variable names.
 */

// =============================================================================
// PAGE GEOMETRY
// =============================================================================

/// Page size assumed when the OS cannot be queried
pub const FALLBACK_PAGE_SIZE: usize = 4096;

// =============================================================================
// SESSION DEFAULTS
// =============================================================================

/// Pages reserved as the initial extent by `init`
pub const DEFAULT_INITIAL_PAGES: usize = 1;

/// Upper bound on the initial reservation (256MB with 4KB pages)
pub const MAX_INITIAL_PAGES: usize = 64 * 1024;

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Overrides `MemsConfig::initial_pages`
pub const ENV_INITIAL_PAGES: &str = "MEMS_INITIAL_PAGES";

/// Overrides `MemsConfig::extent_policy` (`page_rounded` or `exact`)
pub const ENV_EXTENT_POLICY: &str = "MEMS_EXTENT_POLICY";

/// Overrides `MemsConfig::coalesce` (`1`/`true` or `0`/`false`)
pub const ENV_COALESCE: &str = "MEMS_COALESCE";

/// Overrides `MemsConfig::max_mapped_bytes`
pub const ENV_MAX_MAPPED_BYTES: &str = "MEMS_MAX_MAPPED_BYTES";

/// Enables JSON trace output when set to `1` or `true`
pub const ENV_TRACE_JSON: &str = "MEMS_TRACE_JSON";
