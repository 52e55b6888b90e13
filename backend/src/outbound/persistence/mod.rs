//! PostgreSQL adapter for the relational port, built on Diesel.
//!
//! - [`DbPool`] / [`PoolConfig`]: bb8 pool of `diesel-async` connections.
//! - [`DieselTable`]: per-request unit of work; entities opt in with
//!   [`diesel_entity!`](crate::diesel_entity).
//! - [`map_diesel_error`] / [`map_pool_error`]: classification into
//!   [`StoreError`](crate::domain::ports::StoreError).

mod diesel_error_mapping;
mod diesel_table;
mod pool;

pub use diesel_error_mapping::{map_diesel_error, map_pool_error};
pub use diesel_table::{
    DieselTable, QueryFilter, UnitOfWorkError, from_count, refine, to_bigint,
};
pub use pool::{DbPool, PoolConfig, PoolError};
