//! Ledger error types.

use thiserror::Error;

/// Ledger errors.
///
/// Every error ends the current invocation; its writes are rolled back.
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The submitted JSON could not be decoded.
    #[error("failed to parse {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A required field is empty or a type tag does not match.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The caller's identity carries no role claim.
    #[error("client role not found")]
    AttributeMissing,

    /// The identity provider failed.
    #[error(transparent)]
    Identity(#[from] policy::Error),

    /// The caller's role may not perform the operation at all. `id` names
    /// the targeted record for operations that have one.
    #[error("unauthorized: {reason}")]
    Unauthorized {
        role: String,
        id: Option<String>,
        reason: String,
    },

    /// The caller's role may not act on this particular record.
    #[error("forbidden: {reason}")]
    Forbidden {
        role: String,
        id: String,
        reason: String,
    },

    /// A record with the same identifier already exists.
    #[error("{kind} with ID {id} already exists")]
    Conflict { kind: &'static str, id: String },

    /// No record with this identifier exists.
    #[error("{kind} with ID {id} does not exist")]
    NotFound { kind: &'static str, id: String },

    /// A record could not be encoded, or a stored value could not be decoded.
    #[error("failed to (de)serialize {key}: {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The world state reported a failure.
    #[error(transparent)]
    Store(#[from] storage::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
