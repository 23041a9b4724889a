//! Registry storage for catalogs and published conflict sets.
//!
//! Provides the [`RegistryStore`] trait defining the storage contract that
//! all backends implement, plus [`InMemoryStore`] and [`SqliteStore`] as
//! first-class backends.
//!
//! # Publishing
//!
//! An analysis run produces a [`procset_core::ConflictReport`]. Publishing it
//! with [`RegistryStore::replace_conflicts`] clears every stored set of the
//! catalog, then writes the new sets, as one atomic unit. Sets of procedures
//! the run skipped are dropped too, so the stored relation always equals the
//! last published report and its fingerprint describes exactly what
//! [`RegistryStore::load_conflicts`] returns.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`types`]: CatalogId, CatalogSummary storage-layer types
//! - [`traits`]: RegistryStore trait definition
//! - [`convert`]: ConflictReport decompose/recompose and validation
//! - [`hash`]: blake3 report fingerprints
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: migrations and connection setup
//! - [`sqlite`]: SqliteStore implementation

pub mod convert;
pub mod error;
pub mod hash;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use hash::{report_fingerprint, report_fingerprint_hex};
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::RegistryStore;
pub use types::{CatalogId, CatalogSummary};
