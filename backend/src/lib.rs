//! Uniform repository contract with result envelopes.
//!
//! One CRUD, query and paging contract ([`domain::Repository`]) is served by
//! two implementations: [`repository::RelationalRepository`] over a tracked
//! relational table and [`repository::DocumentRepository`] over a document
//! collection. Every call returns a [`domain::Envelope`]; store failures are
//! reported through it and never raised.
//!
//! Adapters live under [`outbound`]: Diesel/PostgreSQL, MongoDB, and an
//! in-memory pair for tests.

pub mod config;
pub mod domain;
pub mod outbound;
pub mod repository;
pub mod telemetry;

pub use pagination::{Page, PageRequest, PageRequestError};

#[doc(hidden)]
pub mod __private {
    pub use async_trait::async_trait;
    pub use diesel;
    pub use diesel_async;
    pub use tracing;
}
