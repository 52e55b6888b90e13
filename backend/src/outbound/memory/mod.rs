//! In-memory adapters for the relational and document ports.
//!
//! Both adapters keep records ordered by id, apply staged or transactional
//! writes atomically, and accept one injected failure at a time so callers
//! can exercise error envelopes without a live store.

mod collection;
mod table;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

pub use collection::{InMemoryCollection, InMemorySession};
pub use table::InMemoryTable;

use crate::domain::ports::StoreError;

/// Caller-supplied filter over an entity, applied as-is.
pub struct Predicate<T>(Arc<dyn Fn(&T) -> bool + Send + Sync>);

impl<T> Predicate<T> {
    /// Wrap a closure.
    pub fn new(predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    /// Evaluate the predicate.
    pub fn matches(&self, entity: &T) -> bool {
        (self.0)(entity)
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

fn matches_filter<T>(filter: Option<&Predicate<T>>, entity: &T) -> bool {
    filter.is_none_or(|predicate| predicate.matches(entity))
}

/// One-shot failure slot shared by clones of an adapter.
#[derive(Debug, Default, Clone)]
struct FailureSlot(Arc<Mutex<Option<StoreError>>>);

impl FailureSlot {
    fn arm(&self, error: StoreError) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    fn check(&self) -> Result<(), StoreError> {
        match self.0.lock().unwrap_or_else(PoisonError::into_inner).take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn window<T>(rows: impl Iterator<Item = T>, skip: u64, take: u64) -> Vec<T> {
    let skip = usize::try_from(skip).unwrap_or(usize::MAX);
    let take = usize::try_from(take).unwrap_or(usize::MAX);
    rows.skip(skip).take(take).collect()
}
