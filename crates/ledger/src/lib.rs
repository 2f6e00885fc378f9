//! CTI metadata ledger contracts.
//!
//! Two contracts run over a [`storage::WorldState`]:
//!
//! - [`MetadataLedger`]: role-gated create/read/update/delete of
//!   [`CtiMetadata`] records plus a paginated listing that hides records the
//!   caller may not see. Decisions come from [`policy::AccessPolicy`].
//! - [`stix::StixLedger`]: STIX 2.1 objects stored by id without access
//!   control.
//!
//! # Example
//!
//! ```no_run
//! use ledger::MetadataLedger;
//! use policy::StaticIdentity;
//! use storage::SqliteState;
//!
//! let state = SqliteState::open("ledger.db", "cti")?;
//! let mut ledger = MetadataLedger::new(state, StaticIdentity::with_role("HeadOfOperations"));
//! ledger.init_ledger()?;
//!
//! let mut bookmark = String::new();
//! loop {
//!     let page = ledger.get_all_cti(10, &bookmark)?;
//!     for record in &page.metadata_list {
//!         println!("{} {}", record.uuid, record.description);
//!     }
//!     if page.bookmark.is_empty() {
//!         break;
//!     }
//!     bookmark = page.bookmark;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod ledger;
mod metadata;
pub mod stix;

pub use error::{Error, Result};
pub use ledger::{MetadataLedger, Page};
pub use metadata::{CtiMetadata, KEY_PREFIX, metadata_key};
