//! Port for named document collections and their session transactions.
//!
//! Documents are fetched and replaced wholesale; nothing is tracked between
//! calls. Multi-step writes run inside a [`DocumentSession`] transaction
//! started from the collection.

use async_trait::async_trait;

use crate::domain::{Entity, EntityId};

use super::StoreError;

/// A client session able to run one transaction at a time.
///
/// Dropping a session with a transaction still open abandons the
/// transaction; adapters must make sure the store aborts it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentSession: Send {
    /// Begin a transaction on this session.
    async fn start_transaction(&mut self) -> Result<(), StoreError>;

    /// Commit the open transaction.
    async fn commit_transaction(&mut self) -> Result<(), StoreError>;

    /// Abort the open transaction, discarding its writes.
    async fn abort_transaction(&mut self) -> Result<(), StoreError>;
}

/// Accessor for one named collection of documents.
///
/// Writes accept an optional session; when one is supplied the write joins
/// that session's open transaction.
#[async_trait]
pub trait DocumentCollection<T: Entity>: Send + Sync {
    /// Store-native filter document.
    type Filter: Clone + Send + Sync;
    /// Session type produced by [`start_session`](Self::start_session).
    type Session: DocumentSession;

    /// Fetch every document, optionally filtered.
    async fn find_all(&self, filter: Option<&Self::Filter>) -> Result<Vec<T>, StoreError>;

    /// Fetch the first document matching `filter`.
    async fn find_one(&self, filter: &Self::Filter) -> Result<Option<T>, StoreError>;

    /// Fetch the document whose id equals `id`.
    async fn find_by_id(&self, id: EntityId) -> Result<Option<T>, StoreError>;

    /// Count documents, optionally filtered.
    async fn count(&self, filter: Option<&Self::Filter>) -> Result<u64, StoreError>;

    /// Fetch at most `limit` documents after skipping `skip`, ordered by id.
    async fn find_page(
        &self,
        filter: Option<&Self::Filter>,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<T>, StoreError>;

    /// Insert a new document.
    async fn insert_one(
        &self,
        entity: &T,
        session: Option<&mut Self::Session>,
    ) -> Result<(), StoreError>;

    /// Replace the document with the same id, returning how many matched.
    async fn replace_one(
        &self,
        entity: &T,
        session: Option<&mut Self::Session>,
    ) -> Result<u64, StoreError>;

    /// Delete the document with `id`, returning how many were removed.
    async fn delete_one(&self, id: EntityId) -> Result<u64, StoreError>;

    /// Open a new client session.
    async fn start_session(&self) -> Result<Self::Session, StoreError>;
}
