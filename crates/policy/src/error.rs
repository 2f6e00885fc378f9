//! Policy error types.

use thiserror::Error;

/// Policy errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Failed to parse a policy file.
    #[error("failed to parse policy: {0}")]
    Parse(String),

    /// The identity provider failed to answer an attribute query.
    #[error("failed to get client attribute: {0}")]
    Identity(String),
}

pub type Result<T> = std::result::Result<T, Error>;
