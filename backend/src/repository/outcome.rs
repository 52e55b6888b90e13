//! Shared conversion from store results into envelopes.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::domain::Envelope;
use crate::domain::ports::StoreError;

pub(crate) const ID_EMPTY: &str = "Id cannot be empty.";
pub(crate) const ENTITY_ABSENT: &str = "Entity cannot be null.";
pub(crate) const ENTITY_ID_EMPTY: &str = "Entity Id cannot be empty.";
pub(crate) const NO_MATCH: &str = "No matching entity found.";
pub(crate) const LISTED: &str = "Entities retrieved successfully.";
pub(crate) const NONE_LISTED: &str = "No entities found.";
pub(crate) const FOUND: &str = "Entity found.";
pub(crate) const CREATED: &str = "Entity created successfully.";
pub(crate) const UPDATED: &str = "Entity updated successfully.";
pub(crate) const DELETED: &str = "Entity deleted successfully.";

pub(crate) fn missing(id: impl std::fmt::Display) -> String {
    format!("Entity with Id {id} not found.")
}

/// 200 with the rows, or 204 when the query matched nothing.
pub(crate) fn listing<T>(rows: Vec<T>) -> Envelope<Vec<T>> {
    if rows.is_empty() {
        Envelope::no_content().with_message(NONE_LISTED)
    } else {
        Envelope::ok(rows).with_message(LISTED)
    }
}

/// Report a store failure through an envelope.
pub(crate) fn store_failure<R>(operation: &'static str, error: &StoreError) -> Envelope<R> {
    warn!(
        operation,
        kind = error.variant_name(),
        error = %error,
        "store call failed"
    );
    match error {
        StoreError::Conflict { .. } => Envelope::conflict(error.to_string()),
        StoreError::Cancelled => Envelope::error(error.to_string()),
        _ => Envelope::database_error(error.to_string()),
    }
}

/// Race `call` against the request's cancellation token.
///
/// An already-cancelled token wins without polling `call`.
pub(crate) async fn guarded<F, R>(
    token: Option<&CancellationToken>,
    call: F,
) -> Result<R, StoreError>
where
    F: Future<Output = Result<R, StoreError>>,
{
    let Some(token) = token else {
        return call.await;
    };
    tokio::select! {
        biased;
        () = token.cancelled() => Err(StoreError::cancelled()),
        result = call => result,
    }
}
