//! STIX 2.1 object contract.
//!
//! Indicators, relationships, sightings and bundles are stored under their
//! STIX identifiers without access control. Each kind is a
//! [`TypedRecordStore`] view over the same world state.

mod store;
mod types;

pub use store::{StixLedger, TypedRecordStore};
pub use types::{Bundle, ExternalReference, Indicator, Relationship, Sighting, StixObject};
