/*!
 * Session Configuration
 *
 * Runtime configuration for extent sizing, coalescing and mapping budget
 */

use super::limits::{
    DEFAULT_INITIAL_PAGES, ENV_COALESCE, ENV_EXTENT_POLICY, ENV_INITIAL_PAGES,
    ENV_MAX_MAPPED_BYTES, MAX_INITIAL_PAGES,
};
use super::types::Size;
use crate::memory::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a freshly mapped extent is sized relative to the request that caused it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtentPolicy {
    /// The extent manages the whole page-rounded mapping
    #[default]
    PageRounded,
    /// The extent manages exactly the requested bytes; page slack stays unused
    Exact,
}

impl FromStr for ExtentPolicy {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "page_rounded" | "page-rounded" | "page" => Ok(Self::PageRounded),
            "exact" => Ok(Self::Exact),
            other => Err(MemoryError::InvalidConfig {
                key: ENV_EXTENT_POLICY,
                reason: format!("unknown extent policy '{}'", other),
            }),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemsConfig {
    /// Pages mapped as the initial extent by `init` (0 = no reservation)
    pub initial_pages: usize,
    /// Sizing of extents mapped on demand
    pub extent_policy: ExtentPolicy,
    /// Merge a released segment with adjacent free neighbours
    pub coalesce: bool,
    /// Refuse to map more than this many bytes in total
    pub max_mapped_bytes: Option<Size>,
}

impl Default for MemsConfig {
    fn default() -> Self {
        Self {
            initial_pages: DEFAULT_INITIAL_PAGES,
            extent_policy: ExtentPolicy::PageRounded,
            coalesce: false,
            max_mapped_bytes: None,
        }
    }
}

impl MemsConfig {
    /// Classic MeMS accounting: exact-size extents and no pre-populated free
    /// space, so free bytes only ever come from released allocations
    pub const fn exact() -> Self {
        Self {
            initial_pages: 0,
            extent_policy: ExtentPolicy::Exact,
            coalesce: false,
            max_mapped_bytes: None,
        }
    }

    pub fn with_initial_pages(mut self, pages: usize) -> Self {
        self.initial_pages = pages;
        self
    }

    pub fn with_extent_policy(mut self, policy: ExtentPolicy) -> Self {
        self.extent_policy = policy;
        self
    }

    pub fn with_coalescing(mut self, coalesce: bool) -> Self {
        self.coalesce = coalesce;
        self
    }

    pub fn with_max_mapped_bytes(mut self, limit: Size) -> Self {
        self.max_mapped_bytes = Some(limit);
        self
    }

    /// Defaults overlaid with `MEMS_*` environment variables
    pub fn from_env() -> MemoryResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> MemoryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_INITIAL_PAGES) {
            config.initial_pages = parse_number(ENV_INITIAL_PAGES, &raw)?;
        }
        if let Some(raw) = lookup(ENV_EXTENT_POLICY) {
            config.extent_policy = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_COALESCE) {
            config.coalesce = parse_flag(ENV_COALESCE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_MAPPED_BYTES) {
            config.max_mapped_bytes = Some(parse_number(ENV_MAX_MAPPED_BYTES, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MemoryResult<()> {
        if self.initial_pages > MAX_INITIAL_PAGES {
            return Err(MemoryError::InvalidConfig {
                key: ENV_INITIAL_PAGES,
                reason: format!(
                    "{} pages exceeds the maximum of {}",
                    self.initial_pages, MAX_INITIAL_PAGES
                ),
            });
        }
        if self.max_mapped_bytes == Some(0) {
            return Err(MemoryError::InvalidConfig {
                key: ENV_MAX_MAPPED_BYTES,
                reason: "mapping budget must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number(key: &'static str, raw: &str) -> MemoryResult<usize> {
    raw.trim().parse().map_err(|e| MemoryError::InvalidConfig {
        key,
        reason: format!("'{}' is not a valid number: {}", raw, e),
    })
}

fn parse_flag(key: &'static str, raw: &str) -> MemoryResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(MemoryError::InvalidConfig {
            key,
            reason: format!("'{}' is not a boolean", other),
        }),
    }
}
