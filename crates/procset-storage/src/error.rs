//! Storage error types for procset-storage.
//!
//! [`StorageError`] covers all anticipated failure modes in the registry:
//! SQLite and migration failures, serialization, missing catalogs, reports
//! that do not match their catalog, and corrupted stored conflict data.

use thiserror::Error;

/// Errors produced by registry operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An underlying SQLite call failed.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A catalog with the given ID was not found.
    #[error("catalog not found: {0}")]
    CatalogNotFound(i64),

    /// A report references entities its catalog does not contain.
    #[error("integrity error: {reason}")]
    IntegrityError { reason: String },

    /// Stored conflict rows could not be turned back into a report.
    #[error("reconstruction error: {reason}")]
    ReconstructionError { reason: String },
}
