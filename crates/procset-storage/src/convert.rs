//! Conversion between [`ConflictReport`] and flat storage rows.
//!
//! [`decompose`] flattens a report into one [`ConflictRow`] per conflict,
//! numbered within its set so row order survives a round trip.
//! [`recompose`] rebuilds the report. [`validate_report`] checks a report
//! against the catalog it is about to be published for.

use std::collections::BTreeMap;

use procset_core::{
    Catalog, Conflict, ConflictKind, ConflictReport, ConflictSet, ProcedureId, StatementId,
    TableId,
};

use crate::error::StorageError;

/// One stored conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRow {
    pub subject: ProcedureId,
    pub partner: ProcedureId,
    pub kind: ConflictKind,
    /// Position within the conflict set.
    pub ordinal: u32,
    pub stmt0: StatementId,
    pub stmt1: StatementId,
    pub tables: Vec<TableId>,
    pub always_conflicting: bool,
}

/// Flattens a report into rows, in canonical order.
pub fn decompose(report: &ConflictReport) -> Vec<ConflictRow> {
    let mut rows = Vec::with_capacity(report.conflict_count());
    for set in report.sets() {
        for (ordinal, conflict) in set.conflicts.iter().enumerate() {
            rows.push(ConflictRow {
                subject: set.subject,
                partner: set.partner,
                kind: set.kind,
                ordinal: ordinal as u32,
                stmt0: conflict.stmt0,
                stmt1: conflict.stmt1,
                tables: conflict.tables().to_vec(),
                always_conflicting: conflict.always_conflicting,
            });
        }
    }
    rows
}

/// Rebuilds a report from stored rows.
///
/// Rows may arrive in any order; `ordinal` restores the order within each
/// set.
pub fn recompose(
    analyzed: impl IntoIterator<Item = ProcedureId>,
    rows: Vec<ConflictRow>,
) -> Result<ConflictReport, StorageError> {
    let mut grouped: BTreeMap<(ProcedureId, ProcedureId, ConflictKind), Vec<ConflictRow>> =
        BTreeMap::new();
    for row in rows {
        grouped
            .entry((row.subject, row.partner, row.kind))
            .or_default()
            .push(row);
    }

    let mut sets = Vec::with_capacity(grouped.len());
    for ((subject, partner, kind), mut rows) in grouped {
        rows.sort_by_key(|r| r.ordinal);
        let mut set = ConflictSet::new(subject, partner, kind);
        for row in rows {
            let conflict = Conflict::new(row.stmt0, row.stmt1, row.tables, row.always_conflicting)
                .map_err(|e| StorageError::ReconstructionError {
                    reason: e.to_string(),
                })?;
            set.conflicts.push(conflict);
        }
        sets.push(set);
    }

    Ok(ConflictReport::new(analyzed, sets))
}

fn integrity(reason: String) -> StorageError {
    StorageError::IntegrityError { reason }
}

/// Checks that every ID in `report` exists in `catalog` and that every
/// set's subject was analyzed.
pub fn validate_report(catalog: &Catalog, report: &ConflictReport) -> Result<(), StorageError> {
    for &proc_id in report.analyzed() {
        if catalog.procedure(proc_id).is_none() {
            return Err(integrity(format!("unknown analyzed procedure {}", proc_id)));
        }
    }
    for set in report.sets() {
        if report.analyzed().binary_search(&set.subject).is_err() {
            return Err(integrity(format!(
                "conflict set subject {} was not analyzed",
                set.subject
            )));
        }
        if catalog.procedure(set.partner).is_none() {
            return Err(integrity(format!("unknown partner procedure {}", set.partner)));
        }
        for conflict in &set.conflicts {
            for stmt in [conflict.stmt0, conflict.stmt1] {
                if catalog.statement(stmt).is_none() {
                    return Err(integrity(format!("unknown statement {}", stmt)));
                }
            }
            if let Some(table) = conflict.tables().iter().find(|&&t| catalog.table(t).is_none()) {
                return Err(integrity(format!("unknown table {}", table)));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use procset_core::{ProcedureFacts, SchemaFacts, StatementFacts, TableFacts};

    fn report() -> ConflictReport {
        let mut ww = ConflictSet::new(ProcedureId(0), ProcedureId(0), ConflictKind::WriteWrite);
        ww.conflicts
            .push(Conflict::new(StatementId(0), StatementId(0), [TableId(0)], true).unwrap());
        let mut rw = ConflictSet::new(ProcedureId(1), ProcedureId(0), ConflictKind::ReadWrite);
        rw.conflicts
            .push(Conflict::new(StatementId(1), StatementId(0), [TableId(0)], false).unwrap());
        ConflictReport::new([ProcedureId(0), ProcedureId(1)], vec![ww, rw])
    }

    fn catalog() -> Catalog {
        SchemaFacts {
            tables: vec![TableFacts::new("t", &["a"], &["a"])],
            procedures: vec![
                ProcedureFacts::new("Put").statement(StatementFacts::insert("put").tables(&["t"])),
                ProcedureFacts::new("Get").statement(StatementFacts::select("get").tables(&["t"])),
            ],
        }
        .into_catalog()
        .unwrap()
    }

    #[test]
    fn decompose_numbers_rows_per_set() {
        let rows = decompose(&report());
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.ordinal == 0));
        assert_eq!(rows[0].kind, ConflictKind::WriteWrite);
        assert_eq!(rows[1].subject, ProcedureId(1));
    }

    #[test]
    fn recompose_from_shuffled_rows() {
        let original = report();
        let mut rows = decompose(&original);
        rows.reverse();
        let back = recompose(original.analyzed().iter().copied(), rows).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn recompose_rejects_empty_tables() {
        let mut rows = decompose(&report());
        rows[0].tables.clear();
        assert!(matches!(
            recompose([ProcedureId(0)], rows),
            Err(StorageError::ReconstructionError { .. })
        ));
    }

    #[test]
    fn validate_accepts_matching_report() {
        assert!(validate_report(&catalog(), &report()).is_ok());
    }

    #[test]
    fn validate_rejects_unknown_ids() {
        let mut set = ConflictSet::new(ProcedureId(0), ProcedureId(0), ConflictKind::WriteWrite);
        set.conflicts
            .push(Conflict::new(StatementId(0), StatementId(9), [TableId(0)], true).unwrap());
        let bad = ConflictReport::new([ProcedureId(0)], vec![set]);
        assert!(matches!(
            validate_report(&catalog(), &bad),
            Err(StorageError::IntegrityError { .. })
        ));
    }

    #[test]
    fn validate_rejects_unanalyzed_subject() {
        let mut set = ConflictSet::new(ProcedureId(1), ProcedureId(0), ConflictKind::ReadWrite);
        set.conflicts
            .push(Conflict::new(StatementId(1), StatementId(0), [TableId(0)], false).unwrap());
        let bad = ConflictReport::new([ProcedureId(0)], vec![set]);
        assert!(validate_report(&catalog(), &bad).is_err());
    }
}
