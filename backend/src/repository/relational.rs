//! Repository over a tracked relational table.
//!
//! Reads use detached snapshots. `update` and `delete` load the tracked row
//! first, stage the change, then persist it with one `save_changes` call, so
//! every command is a single unit of work.

use std::marker::PhantomData;

use async_trait::async_trait;
use pagination::{Page, PageRequest, paginate};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::ports::{RelationalTable, StoreError};
use crate::domain::{Entity, EntityId, Envelope, Repository, Write};

use super::outcome::{
    self, CREATED, DELETED, ENTITY_ABSENT, ENTITY_ID_EMPTY, FOUND, ID_EMPTY, NO_MATCH, UPDATED,
    guarded, listing, store_failure,
};

/// [`Repository`] implementation backed by a [`RelationalTable`].
///
/// The table handle is the request's unit of work; do not share one
/// repository between concurrent requests.
///
/// # Examples
/// ```
/// use datastore::domain::{Entity, EntityId, Repository, StatusCode};
/// use datastore::outbound::memory::InMemoryTable;
/// use datastore::repository::RelationalRepository;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Walk { id: EntityId, name: String }
///
/// impl Entity for Walk {
///     fn id(&self) -> EntityId { self.id }
/// }
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let repository = RelationalRepository::new(InMemoryTable::<Walk>::new());
/// let walk = Walk { id: EntityId::random(), name: "river loop".into() };
///
/// let created = repository.create(Some(walk.clone())).await;
/// assert_eq!(created.status_code(), StatusCode::Created);
/// assert_eq!(repository.get(walk.id).await.into_data(), Some(walk));
/// # });
/// ```
pub struct RelationalRepository<T, S> {
    table: S,
    cancellation: Option<CancellationToken>,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S> RelationalRepository<T, S>
where
    T: Entity,
    S: RelationalTable<T>,
{
    /// Wrap a table handle.
    pub const fn new(table: S) -> Self {
        Self {
            table,
            cancellation: None,
            _entity: PhantomData,
        }
    }

    /// Resolve pending store calls to a cancellation envelope once `token` fires.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The underlying table handle.
    pub const fn table(&self) -> &S {
        &self.table
    }

    async fn call<R, F>(&self, future: F) -> Result<R, StoreError>
    where
        F: Future<Output = Result<R, StoreError>> + Send,
    {
        guarded(self.cancellation.as_ref(), future).await
    }

    async fn insert(&self, entity: T) -> Envelope<T> {
        if entity.id().is_nil() {
            return Envelope::bad_request(ENTITY_ID_EMPTY);
        }
        let stored = self
            .call(async {
                self.table.add(entity.clone());
                self.table.save_changes().await
            })
            .await;
        match stored {
            Ok(rows) => {
                debug!(id = %entity.id(), rows, "relational insert persisted");
                Envelope::created(entity).with_message(CREATED)
            }
            Err(error) => store_failure("create", &error),
        }
    }

    async fn replace(&self, entity: T) -> Envelope<T> {
        let id = entity.id();
        if id.is_nil() {
            return Envelope::bad_request(ENTITY_ID_EMPTY);
        }
        let stored = self
            .call(async {
                let Some(mut tracked) = self.table.find_tracked(id).await? else {
                    return Ok(None);
                };
                tracked.set_values(entity.clone());
                self.table.update(tracked);
                self.table.save_changes().await.map(Some)
            })
            .await;
        match stored {
            Ok(Some(rows)) => {
                debug!(%id, rows, "relational replace persisted");
                Envelope::ok(entity).with_message(UPDATED)
            }
            Ok(None) => Envelope::not_found(outcome::missing(id)),
            Err(error) => store_failure("update", &error),
        }
    }
}

#[async_trait]
impl<T, S> Repository<T> for RelationalRepository<T, S>
where
    T: Entity,
    S: RelationalTable<T>,
{
    type Filter = S::Filter;

    async fn get_all(&self) -> Envelope<Vec<T>> {
        match self.call(self.table.load(None)).await {
            Ok(rows) => listing(rows),
            Err(error) => store_failure("get_all", &error),
        }
    }

    async fn get_all_matching(&self, filter: Self::Filter) -> Envelope<Vec<T>> {
        match self.call(self.table.load(Some(&filter))).await {
            Ok(rows) => listing(rows),
            Err(error) => store_failure("get_all_matching", &error),
        }
    }

    async fn get(&self, id: EntityId) -> Envelope<T> {
        if id.is_nil() {
            return Envelope::bad_request(ID_EMPTY);
        }
        match self.call(self.table.find(id)).await {
            Ok(Some(entity)) => Envelope::ok(entity).with_message(FOUND),
            Ok(None) => Envelope::not_found(outcome::missing(id)),
            Err(error) => store_failure("get", &error),
        }
    }

    async fn find(&self, filter: Self::Filter) -> Envelope<T> {
        match self.call(self.table.first(&filter)).await {
            Ok(Some(entity)) => Envelope::ok(entity).with_message(FOUND),
            Ok(None) => Envelope::not_found(NO_MATCH),
            Err(error) => store_failure("find", &error),
        }
    }

    async fn create(&self, entity: Option<T>) -> Envelope<T> {
        match entity {
            Some(entity) => self.insert(entity).await,
            None => Envelope::bad_request(ENTITY_ABSENT),
        }
    }

    async fn update(&self, entity: Option<T>) -> Envelope<T> {
        match entity {
            Some(entity) => self.replace(entity).await,
            None => Envelope::bad_request(ENTITY_ABSENT),
        }
    }

    async fn delete(&self, id: EntityId) -> Envelope<()> {
        if id.is_nil() {
            return Envelope::bad_request(ID_EMPTY);
        }
        let removed = self
            .call(async {
                let Some(tracked) = self.table.find_tracked(id).await? else {
                    return Ok(None);
                };
                self.table.remove(tracked);
                self.table.save_changes().await.map(Some)
            })
            .await;
        match removed {
            Ok(Some(rows)) => {
                debug!(%id, rows, "relational delete persisted");
                Envelope::ok(()).with_message(DELETED)
            }
            Ok(None) => Envelope::not_found(outcome::missing(id)),
            Err(error) => store_failure("delete", &error),
        }
    }

    async fn apply_changes(&self, write: Write<T>) -> Envelope<T> {
        match write {
            Write::Insert(entity) => self.insert(entity).await,
            Write::Replace(entity) => self.replace(entity).await,
        }
    }

    async fn page(&self, filter: Option<Self::Filter>, request: PageRequest) -> Envelope<Page<T>> {
        let filter = filter.as_ref();
        let page = self
            .call(paginate(
                request,
                || self.table.count(filter),
                |skip, take| self.table.load_page(filter, skip, take),
            ))
            .await;
        match page {
            Ok(page) => {
                debug!(
                    page_number = page.page_number(),
                    total_count = page.total_count(),
                    "relational page loaded"
                );
                Envelope::ok(page).with_message(outcome::LISTED)
            }
            Err(error) => store_failure("page", &error),
        }
    }
}
