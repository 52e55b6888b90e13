//! Concrete [`Repository`](crate::domain::Repository) implementations.
//!
//! Both repositories validate caller input, run the store call (optionally
//! racing a cancellation token), and build the envelope from the outcome.
//! Store errors never escape: `Conflict` becomes a 404, cancellation a 500
//! `Exception`, and every other failure a 500 `DatabaseError`.

mod document;
mod outcome;
mod relational;

pub use document::DocumentRepository;
pub use relational::RelationalRepository;
