//! `mdt` - records manager for a role-play dispatch terminal.
//!
//! Citizens, vehicles, incidents, and notes are kept in one JSON document,
//! owned by a [`RecordStore`] and persisted through a key-value [`Backend`]
//! after every change.
//!
//! ```
//! use mdt::{FieldMap, RecordKind, RecordStore};
//!
//! let mut store = RecordStore::open_in_memory()?;
//! let fields: FieldMap = [("content", "Shift change at 0600"), ("agency", "fire")]
//!     .into_iter()
//!     .map(|(k, v)| (k.to_string(), v.to_string()))
//!     .collect();
//!
//! let note = store.create(RecordKind::Note, &fields)?;
//! assert_eq!(store.search(RecordKind::Note, "SHIFT"), [&note]);
//! # Ok::<(), mdt::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod agency;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod record;
pub mod store;

pub use agency::{default_agencies, Agency, AgencyTable};
pub use config::{BackendKind, Config};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{FieldMap, Record, RecordFields, RecordKind};
pub use store::{
    Backend, Document, FileBackend, MemoryBackend, RecordStore, SharedRecordStore, SqliteBackend,
    StoreStats,
};
