//! The uniform data-access contract implemented over every store.
//!
//! Every operation returns an [`Envelope`]; store failures are reported
//! through it and never raised. Both the relational and the document
//! repositories honour the same status mapping:
//!
//! | operation          | 200 / 201 / 204                    | 400                  | 404               |
//! |--------------------|------------------------------------|----------------------|-------------------|
//! | `get_all`          | 200 with rows, 204 when empty      |                      |                   |
//! | `get_all_matching` | 200 with rows, 204 when empty      |                      |                   |
//! | `get`              | 200 with the record                | nil id               | no record         |
//! | `find`             | 200 with the first match           |                      | no match          |
//! | `create`           | 201 echoing the entity             | entity absent        |                   |
//! | `update`           | 200 echoing the entity             | absent or nil id     | no record         |
//! | `delete`           | 200                                | nil id               | no record         |
//! | `apply_changes`    | 201 on insert, 200 on replace      |                      | replace missed    |
//! | `page`             | 200, even for an empty page        |                      |                   |

use async_trait::async_trait;
use pagination::{Page, PageRequest};

use super::{Entity, EntityId, Envelope, Write};

/// Uniform CRUD, query and paging contract for one entity type.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Filter understood by the underlying store, applied as-is.
    type Filter: Clone + Send + Sync;

    /// Return every record.
    async fn get_all(&self) -> Envelope<Vec<T>>;

    /// Return every record matching `filter`.
    async fn get_all_matching(&self, filter: Self::Filter) -> Envelope<Vec<T>>;

    /// Return the record identified by `id`.
    async fn get(&self, id: EntityId) -> Envelope<T>;

    /// Return the first record matching `filter`.
    async fn find(&self, filter: Self::Filter) -> Envelope<T>;

    /// Persist a new record.
    async fn create(&self, entity: Option<T>) -> Envelope<T>;

    /// Fully replace an existing record.
    async fn update(&self, entity: Option<T>) -> Envelope<T>;

    /// Remove the record identified by `id`.
    async fn delete(&self, id: EntityId) -> Envelope<()>;

    /// Insert or replace as chosen by the caller.
    async fn apply_changes(&self, write: Write<T>) -> Envelope<T>;

    /// Return one counted page of records, optionally filtered.
    async fn page(&self, filter: Option<Self::Filter>, request: PageRequest)
    -> Envelope<Page<T>>;
}
