//! The [`RegistryStore`] trait defining the schema registry contract.
//!
//! A registry holds catalog snapshots and, per catalog, the conflict sets
//! published by the most recent analysis of each procedure. All backends
//! (InMemoryStore, SqliteStore) implement this trait and are swappable.

use procset_core::{Catalog, ConflictReport};

use crate::error::StorageError;
use crate::types::{CatalogId, CatalogSummary};

/// The storage contract for catalogs and their conflict sets.
///
/// The trait is synchronous; analysis runs are offline batch jobs.
pub trait RegistryStore {
    /// Registers a catalog snapshot under `name`.
    fn create_catalog(&mut self, name: &str, catalog: &Catalog) -> Result<CatalogId, StorageError>;

    /// Loads a registered catalog snapshot.
    fn load_catalog(&self, id: CatalogId) -> Result<Catalog, StorageError>;

    /// Lists all registered catalogs.
    fn list_catalogs(&self) -> Result<Vec<CatalogSummary>, StorageError>;

    /// Deletes a catalog together with its conflict sets.
    fn delete_catalog(&mut self, id: CatalogId) -> Result<(), StorageError>;

    /// Publishes the result of an analysis run.
    ///
    /// Clears every conflict set of the catalog, including those of
    /// procedures the run skipped, then writes the report's sets. Either all
    /// of this becomes visible or, on error, none of it does.
    fn replace_conflicts(
        &mut self,
        id: CatalogId,
        report: &ConflictReport,
    ) -> Result<(), StorageError>;

    /// Loads every stored conflict set of a catalog.
    ///
    /// Equal to the last published report, analyzed list included.
    fn load_conflicts(&self, id: CatalogId) -> Result<ConflictReport, StorageError>;

    /// Fingerprint of the last published report, or `None` if nothing has
    /// been published yet. Hashing [`RegistryStore::load_conflicts`] gives
    /// the same value.
    fn conflict_fingerprint(&self, id: CatalogId) -> Result<Option<String>, StorageError>;
}
