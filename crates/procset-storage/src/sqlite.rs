//! SQLite implementation of [`RegistryStore`].
//!
//! [`SqliteStore`] persists catalogs and conflict sets in a SQLite database
//! with WAL mode, atomic transactions on every write, and automatic schema
//! migrations. The catalog snapshot itself is stored as a JSON TEXT column;
//! conflict sets are stored relationally so they can be queried per pair.

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{debug, info};

use procset_core::{Catalog, ConflictKind, ConflictReport, ProcedureId, StatementId, TableId};

use crate::convert::{decompose, recompose, validate_report, ConflictRow};
use crate::error::StorageError;
use crate::hash::report_fingerprint_hex;
use crate::traits::RegistryStore;
use crate::types::{CatalogId, CatalogSummary};

/// SQLite-backed implementation of [`RegistryStore`].
///
/// Every write operation is wrapped in a transaction for atomicity.
/// The database uses WAL mode and foreign keys for integrity.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore { conn })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore { conn })
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    /// Verifies a catalog exists, returning an error if not.
    fn assert_catalog_exists(conn: &Connection, id: CatalogId) -> Result<(), StorageError> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM catalogs WHERE id = ?1)",
            params![id.0],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::CatalogNotFound(id.0));
        }
        Ok(())
    }

    fn read_catalog(conn: &Connection, id: CatalogId) -> Result<Catalog, StorageError> {
        let json: Option<String> = conn
            .query_row(
                "SELECT catalog_json FROM catalogs WHERE id = ?1",
                params![id.0],
                |row| row.get(0),
            )
            .optional()?;
        let json = json.ok_or(StorageError::CatalogNotFound(id.0))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Writes the report's sets and pairs. Assumes stale sets were cleared.
    fn insert_rows(
        tx: &Transaction<'_>,
        catalog_id: i64,
        report: &ConflictReport,
    ) -> Result<(), StorageError> {
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO conflict_sets (catalog_id, subject_id, partner_id, kind) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for set in report.sets() {
                stmt.execute(params![
                    catalog_id,
                    set.subject.0,
                    set.partner.0,
                    set.kind.as_str(),
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO conflict_pairs (catalog_id, subject_id, partner_id, kind, ordinal, stmt0_id, stmt1_id, tables_json, always_conflicting) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for row in decompose(report) {
                let tables_json = serde_json::to_string(&row.tables)?;
                stmt.execute(params![
                    catalog_id,
                    row.subject.0,
                    row.partner.0,
                    row.kind.as_str(),
                    row.ordinal,
                    row.stmt0.0,
                    row.stmt1.0,
                    tables_json,
                    row.always_conflicting as i32,
                ])?;
            }
        }

        Ok(())
    }

    fn load_rows(&self, catalog_id: i64) -> Result<Vec<ConflictRow>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT subject_id, partner_id, kind, ordinal, stmt0_id, stmt1_id, tables_json, always_conflicting FROM conflict_pairs WHERE catalog_id = ?1 ORDER BY subject_id, partner_id, kind, ordinal",
        )?;
        let rows = stmt.query_map(params![catalog_id], |row| {
            let subject: u32 = row.get(0)?;
            let partner: u32 = row.get(1)?;
            let kind: String = row.get(2)?;
            let ordinal: u32 = row.get(3)?;
            let stmt0: u32 = row.get(4)?;
            let stmt1: u32 = row.get(5)?;
            let tables_json: String = row.get(6)?;
            let always: i32 = row.get(7)?;
            Ok((subject, partner, kind, ordinal, stmt0, stmt1, tables_json, always))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (subject, partner, kind, ordinal, stmt0, stmt1, tables_json, always) = row?;
            let kind = ConflictKind::parse(&kind).ok_or_else(|| {
                StorageError::ReconstructionError {
                    reason: format!("unknown conflict kind '{}'", kind),
                }
            })?;
            let tables: Vec<TableId> = serde_json::from_str(&tables_json)?;
            result.push(ConflictRow {
                subject: ProcedureId(subject),
                partner: ProcedureId(partner),
                kind,
                ordinal,
                stmt0: StatementId(stmt0),
                stmt1: StatementId(stmt1),
                tables,
                always_conflicting: always != 0,
            });
        }
        Ok(result)
    }

    fn load_analyzed(&self, catalog_id: i64) -> Result<Vec<ProcedureId>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT procedure_id FROM procedures WHERE catalog_id = ?1 AND analyzed = 1 ORDER BY procedure_id",
        )?;
        let rows = stmt.query_map(params![catalog_id], |row| row.get::<_, u32>(0))?;
        let mut result = Vec::new();
        for row in rows {
            result.push(ProcedureId(row?));
        }
        Ok(result)
    }
}

impl RegistryStore for SqliteStore {
    fn create_catalog(&mut self, name: &str, catalog: &Catalog) -> Result<CatalogId, StorageError> {
        let catalog_json = serde_json::to_string(catalog)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO catalogs (name, catalog_json) VALUES (?1, ?2)",
            params![name, catalog_json],
        )?;
        let id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO procedures (catalog_id, procedure_id, name) VALUES (?1, ?2, ?3)",
            )?;
            for proc_def in catalog.procedures() {
                stmt.execute(params![id, proc_def.id.0, proc_def.name])?;
            }
        }
        tx.commit()?;
        debug!(catalog = id, name, "registered catalog");
        Ok(CatalogId(id))
    }

    fn load_catalog(&self, id: CatalogId) -> Result<Catalog, StorageError> {
        Self::read_catalog(&self.conn, id)
    }

    fn list_catalogs(&self) -> Result<Vec<CatalogSummary>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT c.id, c.name, (SELECT COUNT(*) FROM procedures p WHERE p.catalog_id = c.id), r.fingerprint \
             FROM catalogs c LEFT JOIN conflict_runs r ON r.catalog_id = c.id ORDER BY c.id",
        )?;
        let rows = stmt.query_map([], |row| {
            let id: i64 = row.get(0)?;
            let name: String = row.get(1)?;
            let procedures: i64 = row.get(2)?;
            let fingerprint: Option<String> = row.get(3)?;
            Ok(CatalogSummary {
                id: CatalogId(id),
                name,
                procedures: procedures as usize,
                fingerprint,
            })
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn delete_catalog(&mut self, id: CatalogId) -> Result<(), StorageError> {
        Self::assert_catalog_exists(&self.conn, id)?;
        // Procedures, conflict sets, pairs and runs all cascade.
        self.conn
            .execute("DELETE FROM catalogs WHERE id = ?1", params![id.0])?;
        Ok(())
    }

    fn replace_conflicts(
        &mut self,
        id: CatalogId,
        report: &ConflictReport,
    ) -> Result<(), StorageError> {
        let fingerprint = report_fingerprint_hex(report)?;
        let tx = self.conn.transaction()?;

        let catalog = Self::read_catalog(&tx, id)?;
        validate_report(&catalog, report)?;

        // The published relation is exactly `report`; nothing from earlier runs survives.
        tx.execute("DELETE FROM conflict_sets WHERE catalog_id = ?1", params![id.0])?;
        tx.execute(
            "UPDATE procedures SET analyzed = 0 WHERE catalog_id = ?1",
            params![id.0],
        )?;
        {
            let mut mark = tx.prepare_cached(
                "UPDATE procedures SET analyzed = 1 WHERE catalog_id = ?1 AND procedure_id = ?2",
            )?;
            for proc_id in report.analyzed() {
                mark.execute(params![id.0, proc_id.0])?;
            }
        }

        Self::insert_rows(&tx, id.0, report)?;

        tx.execute(
            "INSERT INTO conflict_runs (catalog_id, fingerprint) VALUES (?1, ?2) \
             ON CONFLICT(catalog_id) DO UPDATE SET fingerprint = excluded.fingerprint, published_at = datetime('now')",
            params![id.0, fingerprint],
        )?;

        tx.commit()?;
        info!(
            catalog = %id,
            sets = report.sets().len(),
            conflicts = report.conflict_count(),
            fingerprint = %fingerprint,
            "published conflict sets"
        );
        Ok(())
    }

    fn load_conflicts(&self, id: CatalogId) -> Result<ConflictReport, StorageError> {
        Self::assert_catalog_exists(&self.conn, id)?;
        let analyzed = self.load_analyzed(id.0)?;
        let rows = self.load_rows(id.0)?;
        recompose(analyzed, rows)
    }

    fn conflict_fingerprint(&self, id: CatalogId) -> Result<Option<String>, StorageError> {
        Self::assert_catalog_exists(&self.conn, id)?;
        let fingerprint = self
            .conn
            .query_row(
                "SELECT fingerprint FROM conflict_runs WHERE catalog_id = ?1",
                params![id.0],
                |row| row.get(0),
            )
            .optional()?;
        Ok(fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procset_core::{
        Conflict, ConflictSet, ProcedureFacts, SchemaFacts, StatementFacts, TableFacts,
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

    fn report() -> ConflictReport {
        let mut ww = ConflictSet::new(ProcedureId(0), ProcedureId(0), ConflictKind::WriteWrite);
        ww.conflicts
            .push(Conflict::new(StatementId(0), StatementId(0), [TableId(0)], true).unwrap());
        let mut rw = ConflictSet::new(ProcedureId(1), ProcedureId(0), ConflictKind::ReadWrite);
        rw.conflicts
            .push(Conflict::new(StatementId(1), StatementId(0), [TableId(0)], false).unwrap());
        ConflictReport::new([ProcedureId(0), ProcedureId(1)], vec![ww, rw])
    }

    #[test]
    fn catalog_survives_json_column() {
        let mut store = SqliteStore::in_memory().unwrap();
        let id = store.create_catalog("bench", &catalog()).unwrap();
        assert_eq!(store.load_catalog(id).unwrap(), catalog());
    }

    #[test]
    fn publish_and_load() {
        let mut store = SqliteStore::in_memory().unwrap();
        let id = store.create_catalog("bench", &catalog()).unwrap();
        assert_eq!(store.conflict_fingerprint(id).unwrap(), None);

        store.replace_conflicts(id, &report()).unwrap();
        assert_eq!(store.load_conflicts(id).unwrap(), report());
        assert_eq!(
            store.conflict_fingerprint(id).unwrap(),
            Some(report_fingerprint_hex(&report()).unwrap())
        );
    }

    #[test]
    fn publish_replaces_every_set() {
        let mut store = SqliteStore::in_memory().unwrap();
        let id = store.create_catalog("bench", &catalog()).unwrap();
        store.replace_conflicts(id, &report()).unwrap();

        let second = ConflictReport::new([ProcedureId(1)], vec![]);
        store.replace_conflicts(id, &second).unwrap();

        let sets: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM conflict_sets", [], |row| row.get(0))
            .unwrap();
        assert_eq!(sets, 0);
        assert_eq!(store.load_conflicts(id).unwrap(), second);
        assert_eq!(
            store.conflict_fingerprint(id).unwrap(),
            Some(report_fingerprint_hex(&second).unwrap())
        );
    }

    #[test]
    fn delete_cascades() {
        let mut store = SqliteStore::in_memory().unwrap();
        let id = store.create_catalog("bench", &catalog()).unwrap();
        store.replace_conflicts(id, &report()).unwrap();
        store.delete_catalog(id).unwrap();

        let pairs: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM conflict_pairs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(pairs, 0);
        assert!(matches!(
            store.load_conflicts(id),
            Err(StorageError::CatalogNotFound(_))
        ));
    }

    #[test]
    fn pair_rows_require_parent_set() {
        let mut store = SqliteStore::in_memory().unwrap();
        let id = store.create_catalog("bench", &catalog()).unwrap();
        store.replace_conflicts(id, &report()).unwrap();
        store
            .conn
            .execute("UPDATE conflict_pairs SET kind = 'XX' WHERE subject_id = 1", [])
            .unwrap_err();
        assert_eq!(store.load_conflicts(id).unwrap(), report());
    }
}
