//! Error type shared by every store adapter.
//!
//! Adapters return `Result<_, StoreError>` instead of raising; repositories
//! turn each variant into an envelope at their boundary.

use super::define_port_error;

define_port_error! {
    /// Failures reported by store adapters.
    pub enum StoreError {
        /// The store could not be reached or a connection could not be checked out.
        Connection { message: String } =>
            "store connection failed: {message}",
        /// A query or mutation failed while executing.
        Query { message: String } =>
            "store query failed: {message}",
        /// A uniqueness, foreign-key, or check constraint rejected the write.
        Constraint { message: String } =>
            "store constraint violated: {message}",
        /// A record could not be encoded for, or decoded from, the store.
        Serialization { message: String } =>
            "store serialisation failed: {message}",
        /// A staged replace or delete matched no record when it was applied.
        Conflict { message: String } =>
            "concurrent modification: {message}",
        /// The caller cancelled the request while the store call was pending.
        Cancelled =>
            "operation cancelled",
    }
}
