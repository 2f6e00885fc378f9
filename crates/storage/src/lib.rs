//! World-state storage for the CTI ledger contracts.
//!
//! Contracts never talk to a database directly. They read and write an
//! ordered key-value [`WorldState`] that supports point lookups and
//! paginated range scans with opaque bookmarks, and they run every
//! invocation through [`atomically`] so that its writes commit together or
//! not at all.
//!
//! # Implementations
//!
//! - [`MemoryState`]: an ordered in-memory map, used by tests.
//! - [`SqliteState`]: a SQLite table shared by several namespaces, one per
//!   contract.
//!
//! # Example
//!
//! ```no_run
//! use storage::{atomically, SqliteState, WorldState};
//!
//! let mut state = SqliteState::open("ledger.db", "cti")?;
//! atomically(&mut state, |s| s.put_state("CTI_12345", br#"{"UUID":"12345"}"#))?;
//!
//! let page = state.range_scan("", "", 10, "")?;
//! let bookmark = page.bookmark().to_string();
//! for entry in page {
//!     let (key, value) = entry?;
//!     println!("{key}: {} bytes", value.len());
//! }
//! println!("next page: {bookmark:?}");
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod memory;
mod sqlite;
mod state;

pub use error::{Error, Result};
pub use memory::MemoryState;
pub use sqlite::SqliteState;
pub use state::{KeyValue, ScanPage, WorldState, atomically};
