//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced event or entrant record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A requested transition precondition was violated.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A concurrent transaction touched a document this one read.
    #[error("write conflict on {path}: expected version {expected}, found {actual}")]
    Conflict {
        /// Path of the document that had the conflict.
        path: String,
        /// The version observed when the document was read.
        expected: i64,
        /// The version found at commit time.
        actual: i64,
    },

    /// A transport or backing-store failure.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}
