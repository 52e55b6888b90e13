//! Port for tracked relational tables.
//!
//! A [`RelationalTable`] is the per-request handle a relational repository
//! drives: untracked reads, tracked loads for writes, staged changes, and a
//! single `save_changes` call that applies everything staged inside one
//! database transaction.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::{Entity, EntityId};

use super::StoreError;

/// A record loaded for modification within the current unit of work.
///
/// The identifier is captured at load time and is the key used when the
/// staged replace or delete is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracked<T> {
    id: EntityId,
    current: T,
}

impl<T: Entity> Tracked<T> {
    /// Start tracking a freshly loaded record.
    pub fn new(entity: T) -> Self {
        Self {
            id: entity.id(),
            current: entity,
        }
    }

    /// Identifier captured when the record was loaded.
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Current values, including any overwrite applied with [`Self::set_values`].
    pub const fn current(&self) -> &T {
        &self.current
    }

    /// Overwrite every persisted field with `values`.
    ///
    /// This is a full replace, not a patch. The tracked id is kept.
    pub fn set_values(&mut self, values: T) {
        self.current = values;
    }

    /// Stop tracking, returning the current values.
    pub fn into_current(self) -> T {
        self.current
    }
}

/// A write staged against a table and applied by `save_changes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingChange<T> {
    /// Insert a new row.
    Insert(T),
    /// Replace every column of the row with the given id.
    Update {
        /// Row to replace.
        id: EntityId,
        /// Replacement values.
        values: T,
    },
    /// Remove the row with the given id.
    Delete(EntityId),
}

/// Ordered list of staged writes owned by one table handle.
///
/// Adapters stage through `&self`, so the list sits behind a mutex. The lock
/// is only held while pushing or draining and never across an await.
#[derive(Debug)]
pub struct ChangeTracker<T> {
    pending: Mutex<Vec<PendingChange<T>>>,
}

impl<T> Default for ChangeTracker<T> {
    fn default() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
        }
    }
}

impl<T> ChangeTracker<T> {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a change.
    pub fn stage(&self, change: PendingChange<T>) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(change);
    }

    /// Drain every staged change in staging order.
    pub fn take(&self) -> Vec<PendingChange<T>> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of changes waiting for `save_changes`.
    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tracked table accessor and unit of work for one entity type.
///
/// Reads return detached snapshots and never observe staged changes. Writes
/// are staged with [`add`](Self::add), [`update`](Self::update) and
/// [`remove`](Self::remove) and reach the store only when
/// [`save_changes`](Self::save_changes) runs.
#[async_trait]
pub trait RelationalTable<T: Entity>: Send + Sync {
    /// Store-native filter applied to reads.
    type Filter: Clone + Send + Sync;

    /// Load every row, optionally filtered, in primary-key order.
    async fn load(&self, filter: Option<&Self::Filter>) -> Result<Vec<T>, StoreError>;

    /// Load the first row matching `filter`.
    async fn first(&self, filter: &Self::Filter) -> Result<Option<T>, StoreError>;

    /// Count rows, optionally filtered.
    async fn count(&self, filter: Option<&Self::Filter>) -> Result<u64, StoreError>;

    /// Load at most `take` rows after skipping `skip`, in primary-key order.
    async fn load_page(
        &self,
        filter: Option<&Self::Filter>,
        skip: u64,
        take: u64,
    ) -> Result<Vec<T>, StoreError>;

    /// Load a detached snapshot of the row with `id`.
    async fn find(&self, id: EntityId) -> Result<Option<T>, StoreError>;

    /// Load a row for modification.
    async fn find_tracked(&self, id: EntityId) -> Result<Option<Tracked<T>>, StoreError>;

    /// Stage an insert.
    fn add(&self, entity: T);

    /// Stage a full replace of a tracked row.
    fn update(&self, tracked: Tracked<T>);

    /// Stage removal of a tracked row.
    fn remove(&self, tracked: Tracked<T>);

    /// Apply every staged change inside one transaction.
    ///
    /// Returns the number of rows written. A staged update or delete that
    /// matches no row rolls the transaction back with
    /// [`StoreError::Conflict`]. Staged changes are consumed whether or not
    /// the transaction commits.
    async fn save_changes(&self) -> Result<usize, StoreError>;
}
