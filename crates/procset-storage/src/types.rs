//! Storage-layer types for catalog identity and metadata.
//!
//! [`CatalogId`] is defined here (not in procset-core) because catalog
//! identity is a storage concern -- a snapshot only gains an ID when
//! registered.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a registered catalog snapshot.
///
/// The inner `i64` aligns with SQLite's `INTEGER PRIMARY KEY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CatalogId(pub i64);

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CatalogId({})", self.0)
    }
}

/// Summary of a registered catalog (for listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub id: CatalogId,
    pub name: String,
    pub procedures: usize,
    /// Fingerprint of the last published conflict report, if any.
    pub fingerprint: Option<String>,
}
