//! Repository over a named document collection.
//!
//! Documents are read by id or caller filter and replaced wholesale. The
//! upsert path is the only multi-step write: it runs inside a session
//! transaction that commits only when the insert or replace took effect.

use std::marker::PhantomData;

use async_trait::async_trait;
use pagination::{Page, PageRequest, paginate};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::domain::ports::{DocumentCollection, DocumentSession, StoreError};
use crate::domain::{Entity, EntityId, Envelope, Repository, Write};

use super::outcome::{
    self, CREATED, DELETED, ENTITY_ABSENT, ENTITY_ID_EMPTY, FOUND, ID_EMPTY, LISTED, NO_MATCH,
    UPDATED, guarded, listing, store_failure,
};

/// Result of a transactional upsert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    Inserted,
    Replaced,
    Missing,
}

/// Commit a successful attempt; abort a missed replace or a failed write.
///
/// Abort failures are logged and never replace the attempt's own outcome.
async fn settle<S: DocumentSession>(
    session: &mut S,
    attempt: Result<Applied, StoreError>,
) -> Result<Applied, StoreError> {
    match attempt {
        Ok(Applied::Missing) => {
            abort_quietly(session, "replace matched no document").await;
            Ok(Applied::Missing)
        }
        Ok(applied) => {
            session.commit_transaction().await?;
            Ok(applied)
        }
        Err(error) => {
            abort_quietly(session, "write failed").await;
            Err(error)
        }
    }
}

async fn abort_quietly<S: DocumentSession>(session: &mut S, reason: &'static str) {
    match session.abort_transaction().await {
        Ok(()) => debug!(reason, "document transaction aborted"),
        Err(error) => warn!(reason, error = %error, "document transaction abort failed"),
    }
}

/// [`Repository`] implementation backed by a [`DocumentCollection`].
pub struct DocumentRepository<T, C> {
    collection: C,
    cancellation: Option<CancellationToken>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, C> DocumentRepository<T, C>
where
    T: Entity,
    C: DocumentCollection<T>,
{
    /// Wrap a collection accessor.
    pub const fn new(collection: C) -> Self {
        Self {
            collection,
            cancellation: None,
            _entity: PhantomData,
        }
    }

    /// Resolve pending store calls to a cancellation envelope once `token`
    /// fires. An upsert transaction in flight is abandoned with its session.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The underlying collection accessor.
    pub const fn collection(&self) -> &C {
        &self.collection
    }

    async fn call<R, F>(&self, future: F) -> Result<R, StoreError>
    where
        F: Future<Output = Result<R, StoreError>> + Send,
    {
        guarded(self.cancellation.as_ref(), future).await
    }

    async fn transact(&self, write: &Write<T>) -> Result<Applied, StoreError> {
        let mut session = self.collection.start_session().await?;
        session.start_transaction().await?;
        let attempt = match write {
            Write::Insert(entity) => self
                .collection
                .insert_one(entity, Some(&mut session))
                .await
                .map(|()| Applied::Inserted),
            Write::Replace(entity) => self
                .collection
                .replace_one(entity, Some(&mut session))
                .await
                .map(|matched| {
                    if matched == 0 {
                        Applied::Missing
                    } else {
                        Applied::Replaced
                    }
                }),
        };
        settle(&mut session, attempt).await
    }
}

#[async_trait]
impl<T, C> Repository<T> for DocumentRepository<T, C>
where
    T: Entity,
    C: DocumentCollection<T>,
{
    type Filter = C::Filter;

    async fn get_all(&self) -> Envelope<Vec<T>> {
        match self.call(self.collection.find_all(None)).await {
            Ok(documents) => listing(documents),
            Err(error) => store_failure("get_all", &error),
        }
    }

    async fn get_all_matching(&self, filter: Self::Filter) -> Envelope<Vec<T>> {
        match self.call(self.collection.find_all(Some(&filter))).await {
            Ok(documents) => listing(documents),
            Err(error) => store_failure("get_all_matching", &error),
        }
    }

    async fn get(&self, id: EntityId) -> Envelope<T> {
        if id.is_nil() {
            return Envelope::bad_request(ID_EMPTY);
        }
        match self.call(self.collection.find_by_id(id)).await {
            Ok(Some(document)) => Envelope::ok(document).with_message(FOUND),
            Ok(None) => Envelope::not_found(outcome::missing(id)),
            Err(error) => store_failure("get", &error),
        }
    }

    async fn find(&self, filter: Self::Filter) -> Envelope<T> {
        match self.call(self.collection.find_one(&filter)).await {
            Ok(Some(document)) => Envelope::ok(document).with_message(FOUND),
            Ok(None) => Envelope::not_found(NO_MATCH),
            Err(error) => store_failure("find", &error),
        }
    }

    async fn create(&self, entity: Option<T>) -> Envelope<T> {
        let Some(entity) = entity else {
            return Envelope::bad_request(ENTITY_ABSENT);
        };
        if entity.id().is_nil() {
            return Envelope::bad_request(ENTITY_ID_EMPTY);
        }
        match self.call(self.collection.insert_one(&entity, None)).await {
            Ok(()) => {
                debug!(id = %entity.id(), "document inserted");
                Envelope::created(entity).with_message(CREATED)
            }
            Err(error) => store_failure("create", &error),
        }
    }

    async fn update(&self, entity: Option<T>) -> Envelope<T> {
        let Some(entity) = entity else {
            return Envelope::bad_request(ENTITY_ABSENT);
        };
        let id = entity.id();
        if id.is_nil() {
            return Envelope::bad_request(ENTITY_ID_EMPTY);
        }
        match self.call(self.collection.replace_one(&entity, None)).await {
            Ok(0) => Envelope::not_found(outcome::missing(id)),
            Ok(_) => {
                debug!(%id, "document replaced");
                Envelope::ok(entity).with_message(UPDATED)
            }
            Err(error) => store_failure("update", &error),
        }
    }

    async fn delete(&self, id: EntityId) -> Envelope<()> {
        if id.is_nil() {
            return Envelope::bad_request(ID_EMPTY);
        }
        match self.call(self.collection.delete_one(id)).await {
            Ok(0) => Envelope::not_found(outcome::missing(id)),
            Ok(_) => {
                debug!(%id, "document deleted");
                Envelope::ok(()).with_message(DELETED)
            }
            Err(error) => store_failure("delete", &error),
        }
    }

    async fn apply_changes(&self, write: Write<T>) -> Envelope<T> {
        let id = write.entity().id();
        if id.is_nil() {
            return Envelope::bad_request(ENTITY_ID_EMPTY);
        }
        match self.call(self.transact(&write)).await {
            Ok(Applied::Inserted) => Envelope::created(write.into_entity()).with_message(CREATED),
            Ok(Applied::Replaced) => Envelope::ok(write.into_entity()).with_message(UPDATED),
            Ok(Applied::Missing) => Envelope::not_found(outcome::missing(id)),
            Err(error) => store_failure("apply_changes", &error),
        }
    }

    async fn page(&self, filter: Option<Self::Filter>, request: PageRequest) -> Envelope<Page<T>> {
        let filter = filter.as_ref();
        let page = self
            .call(paginate(
                request,
                || self.collection.count(filter),
                |skip, limit| self.collection.find_page(filter, skip, limit),
            ))
            .await;
        match page {
            Ok(page) => Envelope::ok(page).with_message(LISTED),
            Err(error) => store_failure("page", &error),
        }
    }
}
