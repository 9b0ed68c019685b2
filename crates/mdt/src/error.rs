//! Error types for mdt.
//!
//! Validation failures (`InvalidAgency`, `NotFound`, `UnknownField`) leave the
//! store untouched. `PersistenceFailure` means the medium refused a write and
//! the in-memory change was rolled back. `CorruptStore` is fatal for opening.

use std::path::PathBuf;
use thiserror::Error;

use crate::record::RecordKind;

/// The main error type for mdt operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Record Errors ===
    /// The agency identifier is not in the agency table.
    #[error("unknown agency '{agency}'")]
    InvalidAgency {
        /// The identifier that failed to resolve.
        agency: String,
    },

    /// No record with the given id exists in the kind's collection.
    #[error("{kind} record '{id}' not found")]
    NotFound {
        /// Collection that was searched.
        kind: RecordKind,
        /// The missing id.
        id: String,
    },

    /// A field mapping named a field the kind does not define.
    #[error("{kind} records have no field '{field}'")]
    UnknownField {
        /// Kind the mapping was applied to.
        kind: RecordKind,
        /// The offending field name.
        field: String,
    },

    // === Persistence Errors ===
    /// The persistence medium failed to write the document.
    #[error("failed to persist store under key '{key}': {source}")]
    PersistenceFailure {
        /// Storage key the document lives under.
        key: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The persistence medium failed to read the document.
    #[error("failed to read store under key '{key}': {source}")]
    StoreRead {
        /// Storage key the document lives under.
        key: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The persisted blob exists but is not a valid document.
    #[error("store under key '{key}' is corrupt: {source}")]
    CorruptStore {
        /// Storage key the document lives under.
        key: String,
        /// The parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to open or create the `SQLite` database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database statement failed.
    #[error("database query failed: {0}")]
    Database(#[from] rusqlite::Error),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for mdt operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an invalid agency error.
    #[must_use]
    pub fn invalid_agency(agency: impl Into<String>) -> Self {
        Self::InvalidAgency {
            agency: agency.into(),
        }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create an unknown field error.
    #[must_use]
    pub fn unknown_field(kind: RecordKind, field: impl Into<String>) -> Self {
        Self::UnknownField {
            kind,
            field: field.into(),
        }
    }

    /// Check if this error is a rejected input that left the store unchanged.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::InvalidAgency { .. } | Self::NotFound { .. } | Self::UnknownField { .. }
        )
    }

    /// Check if this error reports a failed write to the persistence medium.
    #[must_use]
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::PersistenceFailure { .. })
    }
}
