//! Storage error handling
//!
//! Provides typed errors for store operations with descriptive messages
//! and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Operation requires a record that does not exist
    #[error("No record stored under key '{key}'")]
    NotFound { key: String },

    /// Record was written by a newer version of the application
    #[error(
        "Record '{key}' has data version {found}, but this application only understands up to {expected}. Reload or update the application."
    )]
    VersionTooNew { key: String, found: u32, expected: u32 },

    /// No chain of upgrade steps bridges the record's version to the expected one
    #[error(
        "Record '{key}' stopped at data version {reached}; no upgrade step reaches version {expected}"
    )]
    UnupgradableRecord {
        key: String,
        reached: u32,
        expected: u32,
    },

    /// An upgrade step rejected the record
    #[error("Upgrading record '{key}' from version {from} to {to} failed: {details}")]
    UpgradeStepFailed {
        key: String,
        from: u32,
        to: u32,
        details: String,
    },

    /// The database structure is newer than this code declares
    #[error(
        "Database '{database}' has schema version {found}, newer than supported version {expected}. Structural migration is not implemented."
    )]
    StructuralSchemaMismatch {
        database: String,
        found: u32,
        expected: u32,
    },

    /// SQLite reported an error inside a transaction
    #[error("{operation} on '{store}'{} failed: {source}", describe_key(.key))]
    Transaction {
        operation: &'static str,
        store: &'static str,
        key: Option<String>,
        #[source]
        source: rusqlite::Error,
    },

    /// A rename whose target lies inside the subtree being moved
    #[error("Cannot move '{from}' into its own subtree at '{to}'")]
    InvalidRename { from: String, to: String },

    /// A key pattern could not be compiled
    #[error("Invalid key pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Filesystem error around the database file
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A previous operation panicked while holding the connection
    #[error("Database connection is poisoned by an earlier panic")]
    ConnectionPoisoned,

    /// The blocking worker running an operation died
    #[error("Storage task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

fn describe_key(key: &Option<String>) -> String {
    match key {
        Some(key) => format!(" for key '{}'", key),
        None => String::new(),
    }
}

impl StoreError {
    /// Whether the caller should ask the user to reload a newer application
    pub fn is_reload_required(&self) -> bool {
        matches!(self, StoreError::VersionTooNew { .. })
    }

    /// Whether retrying the same operation may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Transaction { source, .. } => matches!(
                source.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
            ),
            _ => false,
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::VersionTooNew { .. } => {
                Some("Data was written by a newer version. Reload or update the application.")
            }
            StoreError::UnupgradableRecord { .. } | StoreError::UpgradeStepFailed { .. } => {
                Some("A data upgrade step is missing or broken. This needs a fix in the application.")
            }
            StoreError::StructuralSchemaMismatch { .. } => {
                Some("The database was created by a newer version. Update the application or reset the store.")
            }
            StoreError::Transaction { .. } if self.is_transient() => {
                Some("The database is busy. Try the operation again.")
            }
            _ => None,
        }
    }
}

/// Extension for tagging SQLite failures with the operation that hit them
pub(crate) trait TransactionContext<T> {
    fn during(self, operation: &'static str, key: Option<&str>) -> StoreResult<T>;
}

impl<T> TransactionContext<T> for Result<T, rusqlite::Error> {
    fn during(self, operation: &'static str, key: Option<&str>) -> StoreResult<T> {
        self.map_err(|source| StoreError::Transaction {
            operation,
            store: super::schema::RECORDS_TABLE,
            key: key.map(str::to_string),
            source,
        })
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
