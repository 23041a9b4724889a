//! Pairwise conflict rules.
//!
//! Both rules are pure functions over two [`ClassifiedStatement`]s. They
//! over-approximate: whenever column-level reasoning cannot prove two
//! statements independent, a conflict is reported.

use std::collections::BTreeSet;

use procset_core::{Conflict, TableId};

use crate::classify::{Access, ClassifiedStatement};
use crate::error::AnalysisError;

fn shared_tables(a: &ClassifiedStatement, b: &ClassifiedStatement) -> BTreeSet<TableId> {
    a.tables.intersection(&b.tables).copied().collect()
}

/// Read-write rule: `read` observes data that `write` may change.
///
/// Any table overlap conflicts, except that an UPDATE which modifies none of
/// the columns the read observes is independent of it.
pub fn read_write_conflict(
    read: &ClassifiedStatement,
    write: &ClassifiedStatement,
) -> Result<Option<Conflict>, AnalysisError> {
    let tables = shared_tables(read, write);
    if tables.is_empty() {
        return Ok(None);
    }

    if let Access::Update { modified, .. } = &write.access {
        if read.observed().is_disjoint(modified) {
            return Ok(None);
        }
    }

    Ok(Some(Conflict::new(read.id, write.id, tables, false)?))
}

/// True if a statement on its own forces every write-write pairing it takes
/// part in to be unconditional.
///
/// The SELECT arm cannot fire for statements drawn from a write set; it is
/// kept so the rule stays safe if it is ever handed a read.
pub fn escalates(stmt: &ClassifiedStatement) -> bool {
    match &stmt.access {
        Access::Delete { key_covered } => !key_covered,
        Access::Read { shape, .. } => shape.is_unbounded(),
        Access::Insert | Access::Update { .. } => false,
    }
}

/// Write-write rule: two writes that may mutate overlapping data.
///
/// Two INSERTs into a shared table always conflict, as does any pairing with
/// a DELETE not bounded by its primary key. Otherwise the two statements
/// must share a referenced column (predicate or set clause).
pub fn write_write_conflict(
    w0: &ClassifiedStatement,
    w1: &ClassifiedStatement,
) -> Result<Option<Conflict>, AnalysisError> {
    let tables = shared_tables(w0, w1);
    if tables.is_empty() {
        return Ok(None);
    }

    let both_insert = matches!((&w0.access, &w1.access), (Access::Insert, Access::Insert));
    let always_conflicting = both_insert || escalates(w0) || escalates(w1);

    if !always_conflicting && w0.referenced.is_disjoint(&w1.referenced) {
        return Ok(None);
    }

    Ok(Some(Conflict::new(w0.id, w1.id, tables, always_conflicting)?))
}
