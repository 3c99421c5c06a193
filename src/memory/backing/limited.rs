/*!
 * Budgeted Backing Store
 * Caps the total number of bytes another store may have mapped at once
 */

use super::Mapping;
use crate::core::types::{round_up, Size};
use crate::memory::traits::BackingStore;
use crate::memory::types::BackingError;
use log::warn;

/// Wraps a backing store and refuses requests past a byte budget
#[derive(Debug)]
pub struct LimitedBacking<B> {
    inner: B,
    limit: Size,
    mapped: Size,
}

impl<B: BackingStore> LimitedBacking<B> {
    pub fn new(inner: B, limit: Size) -> Self {
        Self {
            inner,
            limit,
            mapped: 0,
        }
    }

    /// Bytes currently mapped through this store
    pub fn mapped(&self) -> Size {
        self.mapped
    }
}

impl<B: BackingStore> BackingStore for LimitedBacking<B> {
    fn page_size(&self) -> Size {
        self.inner.page_size()
    }

    fn acquire(&mut self, minimum_size: Size) -> Result<Mapping, BackingError> {
        let rounded = round_up(minimum_size.max(1), self.page_size())
            .ok_or(BackingError::SizeOverflow(minimum_size))?;

        if self.mapped.saturating_add(rounded) > self.limit {
            warn!(
                "Mapping budget exhausted: {} bytes requested, {} of {} bytes mapped",
                rounded, self.mapped, self.limit
            );
            return Err(BackingError::BudgetExhausted {
                requested: rounded,
                mapped: self.mapped,
                limit: self.limit,
            });
        }

        let mapping = self.inner.acquire(minimum_size)?;
        self.mapped += mapping.len();
        Ok(mapping)
    }

    fn release(&mut self, mapping: Mapping) -> Result<(), BackingError> {
        let len = mapping.len();
        self.inner.release(mapping)?;
        self.mapped = self.mapped.saturating_sub(len);
        Ok(())
    }
}
