//! Store-facing ports for the hexagonal boundary.
//!
//! Repositories depend only on these traits; the Diesel, MongoDB and
//! in-memory adapters under `outbound` implement them.

mod macros;
pub(crate) use macros::define_port_error;

mod document_store;
mod relational_store;
mod store_error;

#[cfg(test)]
pub use document_store::MockDocumentSession;
pub use document_store::{DocumentCollection, DocumentSession};
pub use relational_store::{ChangeTracker, PendingChange, RelationalTable, Tracked};
pub use store_error::StoreError;
