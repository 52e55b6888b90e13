//! Mapping from MongoDB driver failures into [`StoreError`].

use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use tracing::debug;

use crate::domain::ports::StoreError;

const DUPLICATE_KEY: i32 = 11000;

/// Classify a driver failure, logging its detail at debug level.
pub fn map_mongo_error(error: MongoError) -> StoreError {
    debug!(error = %error, labels = ?error.labels(), "mongodb operation failed");
    let message = error.to_string();
    match *error.kind {
        ErrorKind::Io(_) | ErrorKind::ServerSelection { .. } => {
            StoreError::connection(message)
        }
        ErrorKind::BsonSerialization(_) | ErrorKind::BsonDeserialization(_) => {
            StoreError::serialization(message)
        }
        ErrorKind::Write(WriteFailure::WriteError(ref write)) if write.code == DUPLICATE_KEY => {
            StoreError::constraint(message)
        }
        _ => StoreError::query(message),
    }
}
