//! Domain primitives shared by every repository and adapter.
//!
//! Purpose: define the entity contract, the result envelope and the
//! repository contract. Keep types immutable and document invariants and
//! serialisation contracts (serde) in each type's Rustdoc.
//!
//! Public surface:
//! - EntityId, Entity, Upsertable, Write: what a storable type provides and
//!   how upserts are routed.
//! - Envelope, StatusCode, ErrorType, EnvelopeFailure: the uniform outcome of
//!   every data-access call.
//! - Repository: the CRUD, query and paging contract.

pub mod entity;
pub mod envelope;
pub mod ports;
pub mod repository;

pub use self::entity::{Entity, EntityId, Upsertable, Write};
pub use self::envelope::{
    Envelope, EnvelopeDecodeError, EnvelopeFailure, ErrorType, StatusCode, UnsupportedStatusCode,
};
pub use self::repository::Repository;

/// Outcome of a repository call lifted into `Result` form.
///
/// # Examples
/// ```
/// use datastore::domain::{Envelope, EnvelopeResult};
///
/// fn first_even(values: Vec<u32>) -> EnvelopeResult<u32> {
///     let found = values.into_iter().find(|v| v % 2 == 0);
///     match found {
///         Some(value) => Envelope::ok(value).into_result(),
///         None => Envelope::not_found("No matching entity found.").into_result(),
///     }
/// }
///
/// assert_eq!(first_even(vec![1, 4]), Ok(Some(4)));
/// assert!(first_even(vec![1, 3]).is_err());
/// ```
pub type EnvelopeResult<T> = Result<Option<T>, EnvelopeFailure>;
