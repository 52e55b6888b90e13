//! Diesel-backed [`RelationalTable`](crate::domain::ports::RelationalTable).
//!
//! [`DieselTable`] owns a pool handle and the staged changes of one unit of
//! work. The port itself is implemented per entity by [`diesel_entity!`],
//! because each entity maps onto its own generated `table!` module.
//!
//! [`diesel_entity!`]: crate::diesel_entity

use std::fmt;
use std::sync::Arc;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::bb8::PooledConnection;

use crate::domain::EntityId;
use crate::domain::ports::{ChangeTracker, StoreError};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::pool::DbPool;

/// Caller-supplied query refinement, applied to the boxed table query.
///
/// # Examples
/// ```ignore
/// let active = QueryFilter::new(|query: walks::BoxedQuery<'static, Pg>| {
///     query.filter(walks::archived.eq(false))
/// });
/// ```
pub struct QueryFilter<Q>(Arc<dyn Fn(Q) -> Q + Send + Sync>);

impl<Q> QueryFilter<Q> {
    /// Wrap a query transformation.
    pub fn new(refine: impl Fn(Q) -> Q + Send + Sync + 'static) -> Self {
        Self(Arc::new(refine))
    }

    /// Apply the refinement.
    pub fn apply(&self, query: Q) -> Q {
        (self.0)(query)
    }
}

impl<Q> Clone for QueryFilter<Q> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<Q> fmt::Debug for QueryFilter<Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueryFilter(..)")
    }
}

/// Apply `filter` when one is supplied.
pub fn refine<Q>(query: Q, filter: Option<&QueryFilter<Q>>) -> Q {
    match filter {
        Some(filter) => filter.apply(query),
        None => query,
    }
}

/// Convert a row offset or limit into Diesel's `BIGINT` representation.
pub fn to_bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Convert a `COUNT(*)` result back into an unsigned count.
pub fn from_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Failure inside a unit-of-work transaction.
#[derive(Debug)]
pub enum UnitOfWorkError {
    /// Diesel reported an error; the transaction rolls back.
    Diesel(diesel::result::Error),
    /// A staged update or delete matched no row.
    Vanished(EntityId),
}

impl From<diesel::result::Error> for UnitOfWorkError {
    fn from(value: diesel::result::Error) -> Self {
        Self::Diesel(value)
    }
}

impl From<UnitOfWorkError> for StoreError {
    fn from(value: UnitOfWorkError) -> Self {
        match value {
            UnitOfWorkError::Diesel(error) => map_diesel_error(error),
            UnitOfWorkError::Vanished(id) => {
                Self::conflict(format!("row {id} no longer exists"))
            }
        }
    }
}

/// Relational table handle for entity `T`, scoped to one unit of work.
pub struct DieselTable<T> {
    pool: DbPool,
    changes: ChangeTracker<T>,
}

impl<T> DieselTable<T> {
    /// Open a unit of work over `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            changes: ChangeTracker::new(),
        }
    }

    /// Open another unit of work sharing the same pool.
    pub fn scope(&self) -> Self {
        Self::new(self.pool.clone())
    }

    /// Changes staged on this handle.
    pub const fn changes(&self) -> &ChangeTracker<T> {
        &self.changes
    }

    /// Check out a connection, reporting pool failures as store errors.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] when the pool cannot supply one.
    pub async fn connection(
        &self,
    ) -> Result<PooledConnection<'_, AsyncPgConnection>, StoreError> {
        self.pool.get().await.map_err(map_pool_error)
    }
}

/// Implement [`RelationalTable`](crate::domain::ports::RelationalTable) for
/// `DieselTable<$entity>` over a Diesel `table!` module.
///
/// The entity must derive `Queryable` (in column order), `Insertable` and
/// `AsChangeset` for the table, and the table's primary key must be a `uuid`
/// column named `id`.
///
/// ```ignore
/// diesel::table! {
///     walks (id) {
///         id -> Uuid,
///         name -> Text,
///     }
/// }
///
/// #[derive(Clone, Queryable, Insertable, AsChangeset)]
/// #[diesel(table_name = walks)]
/// struct Walk { id: uuid::Uuid, name: String }
///
/// datastore::diesel_entity!(Walk => walks);
/// ```
#[macro_export]
macro_rules! diesel_entity {
    ($entity:ty => $table:ident) => {
        #[$crate::__private::async_trait]
        impl $crate::domain::ports::RelationalTable<$entity>
            for $crate::outbound::persistence::DieselTable<$entity>
        {
            type Filter = $crate::outbound::persistence::QueryFilter<
                $table::BoxedQuery<'static, $crate::__private::diesel::pg::Pg>,
            >;

            async fn load(
                &self,
                filter: ::core::option::Option<&Self::Filter>,
            ) -> ::core::result::Result<::std::vec::Vec<$entity>, $crate::domain::ports::StoreError>
            {
                use $crate::__private::diesel::QueryDsl;
                use $crate::outbound::persistence::{map_diesel_error, refine};

                let mut conn = self.connection().await?;
                let query = refine($table::table.into_boxed(), filter).then_order_by($table::id);
                $crate::__private::diesel_async::RunQueryDsl::load(query, &mut conn)
                    .await
                    .map_err(map_diesel_error)
            }

            async fn first(
                &self,
                filter: &Self::Filter,
            ) -> ::core::result::Result<
                ::core::option::Option<$entity>,
                $crate::domain::ports::StoreError,
            >
            {
                use $crate::__private::diesel::{OptionalExtension, QueryDsl};
                use $crate::outbound::persistence::map_diesel_error;

                let mut conn = self.connection().await?;
                let query = filter
                    .apply($table::table.into_boxed())
                    .then_order_by($table::id);
                $crate::__private::diesel_async::RunQueryDsl::first(query, &mut conn)
                    .await
                    .optional()
                    .map_err(map_diesel_error)
            }

            async fn count(
                &self,
                filter: ::core::option::Option<&Self::Filter>,
            ) -> ::core::result::Result<u64, $crate::domain::ports::StoreError> {
                use $crate::__private::diesel::QueryDsl;
                use $crate::outbound::persistence::{from_count, map_diesel_error, refine};

                let mut conn = self.connection().await?;
                let query = refine($table::table.into_boxed(), filter).count();
                $crate::__private::diesel_async::RunQueryDsl::get_result::<i64>(query, &mut conn)
                    .await
                    .map(from_count)
                    .map_err(map_diesel_error)
            }

            async fn load_page(
                &self,
                filter: ::core::option::Option<&Self::Filter>,
                skip: u64,
                take: u64,
            ) -> ::core::result::Result<::std::vec::Vec<$entity>, $crate::domain::ports::StoreError>
            {
                use $crate::__private::diesel::QueryDsl;
                use $crate::outbound::persistence::{map_diesel_error, refine, to_bigint};

                let mut conn = self.connection().await?;
                let query = refine($table::table.into_boxed(), filter)
                    .then_order_by($table::id)
                    .offset(to_bigint(skip))
                    .limit(to_bigint(take));
                $crate::__private::diesel_async::RunQueryDsl::load(query, &mut conn)
                    .await
                    .map_err(map_diesel_error)
            }

            async fn find(
                &self,
                id: $crate::domain::EntityId,
            ) -> ::core::result::Result<
                ::core::option::Option<$entity>,
                $crate::domain::ports::StoreError,
            >
            {
                use $crate::__private::diesel::{OptionalExtension, QueryDsl};
                use $crate::outbound::persistence::map_diesel_error;

                let mut conn = self.connection().await?;
                let query = $table::table.find(*id.as_uuid());
                $crate::__private::diesel_async::RunQueryDsl::first(query, &mut conn)
                    .await
                    .optional()
                    .map_err(map_diesel_error)
            }

            async fn find_tracked(
                &self,
                id: $crate::domain::EntityId,
            ) -> ::core::result::Result<
                ::core::option::Option<$crate::domain::ports::Tracked<$entity>>,
                $crate::domain::ports::StoreError,
            > {
                let found =
                    $crate::domain::ports::RelationalTable::<$entity>::find(self, id).await?;
                Ok(found.map($crate::domain::ports::Tracked::new))
            }

            fn add(&self, entity: $entity) {
                self.changes()
                    .stage($crate::domain::ports::PendingChange::Insert(entity));
            }

            fn update(&self, tracked: $crate::domain::ports::Tracked<$entity>) {
                let id = tracked.id();
                self.changes().stage($crate::domain::ports::PendingChange::Update {
                    id,
                    values: tracked.into_current(),
                });
            }

            fn remove(&self, tracked: $crate::domain::ports::Tracked<$entity>) {
                self.changes()
                    .stage($crate::domain::ports::PendingChange::Delete(tracked.id()));
            }

            async fn save_changes(
                &self,
            ) -> ::core::result::Result<usize, $crate::domain::ports::StoreError> {
                use $crate::__private::diesel::QueryDsl;
                use $crate::__private::diesel_async::AsyncConnection;
                use $crate::__private::diesel_async::RunQueryDsl as AsyncRunQueryDsl;
                use $crate::__private::diesel_async::scoped_futures::ScopedFutureExt as _;
                use $crate::domain::ports::PendingChange;
                use $crate::outbound::persistence::UnitOfWorkError;

                let changes = self.changes().take();
                if changes.is_empty() {
                    return Ok(0);
                }
                let mut conn = self.connection().await?;
                let written = conn
                    .transaction::<_, UnitOfWorkError, _>(|conn| {
                        async move {
                            let mut written = 0_usize;
                            for change in &changes {
                                match change {
                                    PendingChange::Insert(entity) => {
                                        let statement =
                                            $crate::__private::diesel::insert_into($table::table)
                                                .values(entity);
                                        written +=
                                            AsyncRunQueryDsl::execute(statement, conn).await?;
                                    }
                                    PendingChange::Update { id, values } => {
                                        let statement = $crate::__private::diesel::update(
                                            $table::table.find(*id.as_uuid()),
                                        )
                                        .set(values);
                                        let rows =
                                            AsyncRunQueryDsl::execute(statement, conn).await?;
                                        if rows == 0 {
                                            return Err(UnitOfWorkError::Vanished(*id));
                                        }
                                        written += rows;
                                    }
                                    PendingChange::Delete(id) => {
                                        let statement = $crate::__private::diesel::delete(
                                            $table::table.find(*id.as_uuid()),
                                        );
                                        let rows =
                                            AsyncRunQueryDsl::execute(statement, conn).await?;
                                        if rows == 0 {
                                            return Err(UnitOfWorkError::Vanished(*id));
                                        }
                                        written += rows;
                                    }
                                }
                            }
                            Ok(written)
                        }
                        .scope_boxed()
                    })
                    .await?;
                $crate::__private::tracing::debug!(written, "diesel unit of work committed");
                Ok(written)
            }
        }
    };
}
