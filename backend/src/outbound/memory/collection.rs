//! In-memory [`DocumentCollection`] with session transactions.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{DocumentCollection, DocumentSession, StoreError};
use crate::domain::{Entity, EntityId};

use super::{FailureSlot, Predicate, matches_filter, window};

#[derive(Debug)]
struct Shared<T> {
    documents: Mutex<BTreeMap<EntityId, T>>,
    commits: AtomicUsize,
    aborts: AtomicUsize,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<EntityId, T>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Collection of documents held in memory, ordered by id.
///
/// Clones share the same documents, counters and failure slot.
#[derive(Debug)]
pub struct InMemoryCollection<T> {
    shared: Arc<Shared<T>>,
    failure: FailureSlot,
    write_latency: Option<Duration>,
}

impl<T> Clone for InMemoryCollection<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            failure: self.failure.clone(),
            write_latency: self.write_latency,
        }
    }
}

impl<T: Entity> Default for InMemoryCollection<T> {
    fn default() -> Self {
        Self {
            shared: Arc::new(Shared {
                documents: Mutex::new(BTreeMap::new()),
                commits: AtomicUsize::new(0),
                aborts: AtomicUsize::new(0),
            }),
            failure: FailureSlot::default(),
            write_latency: None,
        }
    }
}

impl<T: Entity> InMemoryCollection<T> {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection seeded with `documents`.
    pub fn with_documents(documents: impl IntoIterator<Item = T>) -> Self {
        let collection = Self::new();
        collection
            .shared
            .lock()
            .extend(documents.into_iter().map(|doc| (doc.id(), doc)));
        collection
    }

    /// Delay every insert and replace by `latency` before it runs.
    #[must_use]
    pub fn with_write_latency(mut self, latency: Duration) -> Self {
        self.write_latency = Some(latency);
        self
    }

    /// Make the next collection call fail with `error`.
    pub fn fail_next(&self, error: StoreError) {
        self.failure.arm(error);
    }

    /// Committed documents in id order.
    pub fn snapshot(&self) -> Vec<T> {
        self.shared.lock().values().cloned().collect()
    }

    /// Number of committed transactions.
    pub fn commits(&self) -> usize {
        self.shared.commits.load(Ordering::SeqCst)
    }

    /// Number of aborted or abandoned transactions.
    pub fn aborts(&self) -> usize {
        self.shared.aborts.load(Ordering::SeqCst)
    }

    fn filtered(&self, filter: Option<&Predicate<T>>) -> Vec<T> {
        self.shared
            .lock()
            .values()
            .filter(|doc| matches_filter(filter, doc))
            .cloned()
            .collect()
    }

    async fn before_write(&self) -> Result<(), StoreError> {
        if let Some(latency) = self.write_latency {
            tokio::time::sleep(latency).await;
        }
        self.failure.check()
    }
}

#[derive(Debug)]
enum Staged<T> {
    Insert(T),
    Replace(T),
}

/// Session over an [`InMemoryCollection`].
///
/// Writes made inside a transaction are buffered and applied together on
/// commit. Dropping the session with a transaction open counts as an abort.
#[derive(Debug)]
pub struct InMemorySession<T> {
    shared: Arc<Shared<T>>,
    staged: Option<Vec<Staged<T>>>,
}

impl<T: Entity> InMemorySession<T> {
    fn transaction(&mut self) -> Result<&mut Vec<Staged<T>>, StoreError> {
        self.staged
            .as_mut()
            .ok_or_else(|| StoreError::query("no transaction in progress"))
    }

    fn visible(&self, id: EntityId) -> bool {
        let staged_insert = self.staged.iter().flatten().any(|write| match write {
            Staged::Insert(doc) => doc.id() == id,
            Staged::Replace(_) => false,
        });
        staged_insert || self.shared.lock().contains_key(&id)
    }
}

#[async_trait]
impl<T: Entity> DocumentSession for InMemorySession<T> {
    async fn start_transaction(&mut self) -> Result<(), StoreError> {
        if self.staged.is_some() {
            return Err(StoreError::query("transaction already in progress"));
        }
        self.staged = Some(Vec::new());
        Ok(())
    }

    async fn commit_transaction(&mut self) -> Result<(), StoreError> {
        let staged = std::mem::take(self.transaction()?);
        self.staged = None;

        let mut documents = self.shared.lock();
        let mut working = documents.clone();
        for write in staged {
            match write {
                Staged::Insert(doc) => {
                    let id = doc.id();
                    if working.insert(id, doc).is_some() {
                        return Err(StoreError::constraint(format!("duplicate key {id}")));
                    }
                }
                Staged::Replace(doc) => {
                    let id = doc.id();
                    match working.get_mut(&id) {
                        Some(existing) => *existing = doc,
                        None => {
                            return Err(StoreError::conflict(format!(
                                "document {id} no longer exists"
                            )));
                        }
                    }
                }
            }
        }
        *documents = working;
        self.shared.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn abort_transaction(&mut self) -> Result<(), StoreError> {
        self.transaction()?;
        self.staged = None;
        self.shared.aborts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl<T> Drop for InMemorySession<T> {
    fn drop(&mut self) {
        if self.staged.take().is_some() {
            debug!("in-memory session dropped with an open transaction");
            self.shared.aborts.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl<T: Entity> DocumentCollection<T> for InMemoryCollection<T> {
    type Filter = Predicate<T>;
    type Session = InMemorySession<T>;

    async fn find_all(&self, filter: Option<&Self::Filter>) -> Result<Vec<T>, StoreError> {
        self.failure.check()?;
        Ok(self.filtered(filter))
    }

    async fn find_one(&self, filter: &Self::Filter) -> Result<Option<T>, StoreError> {
        self.failure.check()?;
        Ok(self
            .shared
            .lock()
            .values()
            .find(|doc| filter.matches(doc))
            .cloned())
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<T>, StoreError> {
        self.failure.check()?;
        Ok(self.shared.lock().get(&id).cloned())
    }

    async fn count(&self, filter: Option<&Self::Filter>) -> Result<u64, StoreError> {
        self.failure.check()?;
        let count = self
            .shared
            .lock()
            .values()
            .filter(|doc| matches_filter(filter, doc))
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn find_page(
        &self,
        filter: Option<&Self::Filter>,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<T>, StoreError> {
        self.failure.check()?;
        Ok(window(self.filtered(filter).into_iter(), skip, limit))
    }

    async fn insert_one(
        &self,
        entity: &T,
        session: Option<&mut Self::Session>,
    ) -> Result<(), StoreError> {
        self.before_write().await?;
        let id = entity.id();
        match session {
            Some(session) => {
                if session.visible(id) {
                    return Err(StoreError::constraint(format!("duplicate key {id}")));
                }
                session.transaction()?.push(Staged::Insert(entity.clone()));
            }
            None => {
                let mut documents = self.shared.lock();
                if documents.contains_key(&id) {
                    return Err(StoreError::constraint(format!("duplicate key {id}")));
                }
                documents.insert(id, entity.clone());
            }
        }
        Ok(())
    }

    async fn replace_one(
        &self,
        entity: &T,
        session: Option<&mut Self::Session>,
    ) -> Result<u64, StoreError> {
        self.before_write().await?;
        let id = entity.id();
        match session {
            Some(session) => {
                if !session.visible(id) {
                    return Ok(0);
                }
                session.transaction()?.push(Staged::Replace(entity.clone()));
                Ok(1)
            }
            None => match self.shared.lock().get_mut(&id) {
                Some(existing) => {
                    *existing = entity.clone();
                    Ok(1)
                }
                None => Ok(0),
            },
        }
    }

    async fn delete_one(&self, id: EntityId) -> Result<u64, StoreError> {
        self.failure.check()?;
        Ok(u64::from(self.shared.lock().remove(&id).is_some()))
    }

    async fn start_session(&self) -> Result<Self::Session, StoreError> {
        self.failure.check()?;
        Ok(InMemorySession {
            shared: Arc::clone(&self.shared),
            staged: None,
        })
    }
}
