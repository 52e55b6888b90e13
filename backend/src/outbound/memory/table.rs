//! In-memory [`RelationalTable`] with a per-handle unit of work.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{ChangeTracker, PendingChange, RelationalTable, StoreError, Tracked};
use crate::domain::{Entity, EntityId};

use super::{FailureSlot, Predicate, matches_filter, window};

/// Table of rows held in memory, keyed and ordered by id.
///
/// Each handle owns its staged changes. [`scope`](Self::scope) opens another
/// unit of work over the same rows, which is how concurrent requests are
/// modelled.
#[derive(Debug)]
pub struct InMemoryTable<T> {
    rows: Arc<Mutex<BTreeMap<EntityId, T>>>,
    changes: ChangeTracker<T>,
    failure: FailureSlot,
    write_latency: Option<Duration>,
}

impl<T: Entity> Default for InMemoryTable<T> {
    fn default() -> Self {
        Self {
            rows: Arc::new(Mutex::new(BTreeMap::new())),
            changes: ChangeTracker::new(),
            failure: FailureSlot::default(),
            write_latency: None,
        }
    }
}

impl<T: Entity> InMemoryTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table seeded with `rows`.
    pub fn with_rows(rows: impl IntoIterator<Item = T>) -> Self {
        let table = Self::new();
        table
            .lock()
            .extend(rows.into_iter().map(|row| (row.id(), row)));
        table
    }

    /// Open a new unit of work over the same rows.
    pub fn scope(&self) -> Self {
        Self {
            rows: Arc::clone(&self.rows),
            changes: ChangeTracker::new(),
            failure: self.failure.clone(),
            write_latency: self.write_latency,
        }
    }

    /// Delay every `save_changes` by `latency` between draining the staged
    /// changes and applying them. Scopes opened afterwards inherit the delay.
    #[must_use]
    pub fn with_write_latency(mut self, latency: Duration) -> Self {
        self.write_latency = Some(latency);
        self
    }

    /// Make the next store call on any scope fail with `error`.
    pub fn fail_next(&self, error: StoreError) {
        self.failure.arm(error);
    }

    /// Committed rows in id order.
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<EntityId, T>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn filtered(&self, filter: Option<&Predicate<T>>) -> Vec<T> {
        self.lock()
            .values()
            .filter(|row| matches_filter(filter, row))
            .cloned()
            .collect()
    }
}

fn apply<T: Entity>(
    rows: &mut BTreeMap<EntityId, T>,
    change: PendingChange<T>,
) -> Result<(), StoreError> {
    match change {
        PendingChange::Insert(entity) => {
            let id = entity.id();
            if rows.contains_key(&id) {
                return Err(StoreError::constraint(format!("duplicate key {id}")));
            }
            rows.insert(id, entity);
        }
        PendingChange::Update { id, values } => match rows.get_mut(&id) {
            Some(row) => *row = values,
            None => return Err(StoreError::conflict(format!("row {id} no longer exists"))),
        },
        PendingChange::Delete(id) => {
            if rows.remove(&id).is_none() {
                return Err(StoreError::conflict(format!("row {id} no longer exists")));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl<T: Entity> RelationalTable<T> for InMemoryTable<T> {
    type Filter = Predicate<T>;

    async fn load(&self, filter: Option<&Self::Filter>) -> Result<Vec<T>, StoreError> {
        self.failure.check()?;
        Ok(self.filtered(filter))
    }

    async fn first(&self, filter: &Self::Filter) -> Result<Option<T>, StoreError> {
        self.failure.check()?;
        Ok(self.lock().values().find(|row| filter.matches(row)).cloned())
    }

    async fn count(&self, filter: Option<&Self::Filter>) -> Result<u64, StoreError> {
        self.failure.check()?;
        let count = self
            .lock()
            .values()
            .filter(|row| matches_filter(filter, row))
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn load_page(
        &self,
        filter: Option<&Self::Filter>,
        skip: u64,
        take: u64,
    ) -> Result<Vec<T>, StoreError> {
        self.failure.check()?;
        Ok(window(self.filtered(filter).into_iter(), skip, take))
    }

    async fn find(&self, id: EntityId) -> Result<Option<T>, StoreError> {
        self.failure.check()?;
        Ok(self.lock().get(&id).cloned())
    }

    async fn find_tracked(&self, id: EntityId) -> Result<Option<Tracked<T>>, StoreError> {
        self.failure.check()?;
        Ok(self.lock().get(&id).cloned().map(Tracked::new))
    }

    fn add(&self, entity: T) {
        self.changes.stage(PendingChange::Insert(entity));
    }

    fn update(&self, tracked: Tracked<T>) {
        let id = tracked.id();
        self.changes.stage(PendingChange::Update {
            id,
            values: tracked.into_current(),
        });
    }

    fn remove(&self, tracked: Tracked<T>) {
        self.changes.stage(PendingChange::Delete(tracked.id()));
    }

    async fn save_changes(&self) -> Result<usize, StoreError> {
        let changes = self.changes.take();
        if let Some(latency) = self.write_latency {
            tokio::time::sleep(latency).await;
        }
        self.failure.check()?;
        let written = changes.len();

        let mut rows = self.lock();
        let mut working = rows.clone();
        for change in changes {
            apply(&mut working, change)?;
        }
        *rows = working;
        debug!(written, "in-memory unit of work committed");
        Ok(written)
    }
}
