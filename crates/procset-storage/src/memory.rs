//! In-memory implementation of [`RegistryStore`].
//!
//! [`InMemoryStore`] is a first-class backend for tests and one-shot
//! analyses where persistence isn't needed. Publishing builds a staged copy
//! of the catalog's conflict data and swaps it in only after every step
//! succeeded, matching the all-or-nothing semantics of the SQLite backend.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::info;

use procset_core::{Catalog, ConflictKind, ConflictReport, ConflictSet, ProcedureId};

use crate::convert::validate_report;
use crate::error::StorageError;
use crate::hash::report_fingerprint_hex;
use crate::traits::RegistryStore;
use crate::types::{CatalogId, CatalogSummary};

type SetKey = (ProcedureId, ProcedureId, ConflictKind);

/// Published conflict data for one catalog.
#[derive(Debug, Clone, Default)]
struct StoredConflicts {
    analyzed: BTreeSet<ProcedureId>,
    sets: BTreeMap<SetKey, ConflictSet>,
    fingerprint: Option<String>,
}

/// Data stored for a single catalog in the in-memory backend.
#[derive(Debug, Clone)]
struct StoredCatalog {
    name: String,
    catalog: Catalog,
    conflicts: StoredConflicts,
}

/// In-memory registry backed by HashMaps.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    catalogs: HashMap<CatalogId, StoredCatalog>,
    next_id: i64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            catalogs: HashMap::new(),
            next_id: 1,
        }
    }

    fn get(&self, id: CatalogId) -> Result<&StoredCatalog, StorageError> {
        self.catalogs
            .get(&id)
            .ok_or(StorageError::CatalogNotFound(id.0))
    }

    /// Builds the post-publish state without touching the live one.
    ///
    /// Every non-internal procedure is cleared, analyzed or ignored alike, so
    /// the stored relation is exactly `report`. Internal procedures never
    /// carry conflict sets.
    fn stage(
        stored: &StoredCatalog,
        report: &ConflictReport,
    ) -> Result<StoredConflicts, StorageError> {
        validate_report(&stored.catalog, report)?;

        let sets: BTreeMap<SetKey, ConflictSet> = report
            .sets()
            .iter()
            .map(|set| ((set.subject, set.partner, set.kind), set.clone()))
            .collect();
        Ok(StoredConflicts {
            analyzed: report.analyzed().iter().copied().collect(),
            sets,
            fingerprint: Some(report_fingerprint_hex(report)?),
        })
    }
}

impl RegistryStore for InMemoryStore {
    fn create_catalog(&mut self, name: &str, catalog: &Catalog) -> Result<CatalogId, StorageError> {
        // Default-constructed stores start at 0; keep IDs positive like SQLite.
        let id = CatalogId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        self.catalogs.insert(
            id,
            StoredCatalog {
                name: name.to_string(),
                catalog: catalog.clone(),
                conflicts: StoredConflicts::default(),
            },
        );
        Ok(id)
    }

    fn load_catalog(&self, id: CatalogId) -> Result<Catalog, StorageError> {
        Ok(self.get(id)?.catalog.clone())
    }

    fn list_catalogs(&self) -> Result<Vec<CatalogSummary>, StorageError> {
        let mut summaries: Vec<CatalogSummary> = self
            .catalogs
            .iter()
            .map(|(&id, stored)| CatalogSummary {
                id,
                name: stored.name.clone(),
                procedures: stored.catalog.procedures().len(),
                fingerprint: stored.conflicts.fingerprint.clone(),
            })
            .collect();
        summaries.sort_by_key(|s| s.id);
        Ok(summaries)
    }

    fn delete_catalog(&mut self, id: CatalogId) -> Result<(), StorageError> {
        self.catalogs
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::CatalogNotFound(id.0))
    }

    fn replace_conflicts(
        &mut self,
        id: CatalogId,
        report: &ConflictReport,
    ) -> Result<(), StorageError> {
        let staged = Self::stage(self.get(id)?, report)?;
        let stored = self
            .catalogs
            .get_mut(&id)
            .ok_or(StorageError::CatalogNotFound(id.0))?;
        stored.conflicts = staged;
        info!(
            catalog = %id,
            sets = report.sets().len(),
            conflicts = report.conflict_count(),
            "published conflict sets"
        );
        Ok(())
    }

    fn load_conflicts(&self, id: CatalogId) -> Result<ConflictReport, StorageError> {
        let stored = &self.get(id)?.conflicts;
        Ok(ConflictReport::new(
            stored.analyzed.iter().copied(),
            stored.sets.values().cloned().collect(),
        ))
    }

    fn conflict_fingerprint(&self, id: CatalogId) -> Result<Option<String>, StorageError> {
        Ok(self.get(id)?.conflicts.fingerprint.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procset_core::{
        Conflict, ProcedureFacts, SchemaFacts, StatementFacts, StatementId, TableFacts, TableId,
    };

    fn catalog() -> Catalog {
        SchemaFacts {
            tables: vec![TableFacts::new("t", &["a", "b"], &["a"])],
            procedures: vec![
                ProcedureFacts::new("Put").statement(StatementFacts::insert("put").tables(&["t"])),
                ProcedureFacts::new("Get").statement(StatementFacts::select("get").tables(&["t"])),
            ],
        }
        .into_catalog()
        .unwrap()
    }

    fn ww_put_put() -> ConflictSet {
        let mut set = ConflictSet::new(ProcedureId(0), ProcedureId(0), ConflictKind::WriteWrite);
        set.conflicts
            .push(Conflict::new(StatementId(0), StatementId(0), [TableId(0)], true).unwrap());
        set
    }

    fn rw_get_put() -> ConflictSet {
        let mut set = ConflictSet::new(ProcedureId(1), ProcedureId(0), ConflictKind::ReadWrite);
        set.conflicts
            .push(Conflict::new(StatementId(1), StatementId(0), [TableId(0)], false).unwrap());
        set
    }

    #[test]
    fn create_load_list_delete() {
        let mut store = InMemoryStore::new();
        let id = store.create_catalog("bench", &catalog()).unwrap();
        assert_eq!(store.load_catalog(id).unwrap(), catalog());

        let list = store.list_catalogs().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "bench");
        assert_eq!(list[0].procedures, 2);
        assert_eq!(list[0].fingerprint, None);

        store.delete_catalog(id).unwrap();
        assert!(matches!(
            store.load_catalog(id),
            Err(StorageError::CatalogNotFound(_))
        ));
        assert!(store.delete_catalog(id).is_err());
    }

    #[test]
    fn default_store_ids_are_positive() {
        let mut store = InMemoryStore::default();
        let id = store.create_catalog("a", &catalog()).unwrap();
        assert_eq!(id, CatalogId(1));
        assert_eq!(store.create_catalog("b", &catalog()).unwrap(), CatalogId(2));
    }

    #[test]
    fn replace_publishes_and_fingerprints() {
        let mut store = InMemoryStore::new();
        let id = store.create_catalog("bench", &catalog()).unwrap();
        let report =
            ConflictReport::new([ProcedureId(0), ProcedureId(1)], vec![ww_put_put(), rw_get_put()]);
        store.replace_conflicts(id, &report).unwrap();

        assert_eq!(store.load_conflicts(id).unwrap(), report);
        assert_eq!(
            store.conflict_fingerprint(id).unwrap(),
            Some(report_fingerprint_hex(&report).unwrap())
        );
    }

    #[test]
    fn replace_clears_sets_of_every_procedure() {
        let mut store = InMemoryStore::new();
        let id = store.create_catalog("bench", &catalog()).unwrap();
        let first =
            ConflictReport::new([ProcedureId(0), ProcedureId(1)], vec![ww_put_put(), rw_get_put()]);
        store.replace_conflicts(id, &first).unwrap();

        // Put is left out of the second run; its old sets go as well.
        let second = ConflictReport::new([ProcedureId(1)], vec![]);
        store.replace_conflicts(id, &second).unwrap();

        let loaded = store.load_conflicts(id).unwrap();
        assert_eq!(loaded, second);
        assert!(loaded.write_write(ProcedureId(0), ProcedureId(0)).is_none());
        assert_eq!(
            store.conflict_fingerprint(id).unwrap(),
            Some(report_fingerprint_hex(&loaded).unwrap())
        );
    }

    #[test]
    fn failed_replace_leaves_previous_data() {
        let mut store = InMemoryStore::new();
        let id = store.create_catalog("bench", &catalog()).unwrap();
        let good =
            ConflictReport::new([ProcedureId(0), ProcedureId(1)], vec![ww_put_put(), rw_get_put()]);
        store.replace_conflicts(id, &good).unwrap();
        let fingerprint = store.conflict_fingerprint(id).unwrap();

        let mut broken = ConflictSet::new(ProcedureId(0), ProcedureId(7), ConflictKind::WriteWrite);
        broken
            .conflicts
            .push(Conflict::new(StatementId(0), StatementId(0), [TableId(0)], true).unwrap());
        let bad = ConflictReport::new([ProcedureId(0)], vec![broken]);
        assert!(matches!(
            store.replace_conflicts(id, &bad),
            Err(StorageError::IntegrityError { .. })
        ));

        assert_eq!(store.load_conflicts(id).unwrap(), good);
        assert_eq!(store.conflict_fingerprint(id).unwrap(), fingerprint);
    }

    #[test]
    fn replace_on_missing_catalog() {
        let mut store = InMemoryStore::new();
        assert!(matches!(
            store.replace_conflicts(CatalogId(42), &ConflictReport::default()),
            Err(StorageError::CatalogNotFound(42))
        ));
    }
}
