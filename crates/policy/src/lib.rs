//! Role-based access policy for the CTI metadata ledger.
//!
//! Core principle: **every ledger operation is decided before the store is touched.**
//!
//! The policy is a pure function of the caller's [`Role`], the requested
//! operation and, for per-record operations, the record's sender identity
//! and access list (exposed through [`Protected`]). Caller roles come from
//! an injected [`CallerIdentity`], so decisions can be exercised with a
//! [`StaticIdentity`] instead of a live identity system.

mod error;
mod identity;
mod policy;
mod role;

pub use error::{Error, Result};
pub use identity::{CallerIdentity, StaticIdentity};
pub use policy::{AccessMode, AccessPolicy, Decision, Protected, Request};
pub use role::{Operation, ROLE_ATTRIBUTE, Role};
