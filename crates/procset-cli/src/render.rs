//! JSON output with IDs replaced by catalog names.

use serde_json::{json, Value};

use procset_core::{Catalog, Conflict, ConflictReport, ConflictSet, PairVerdict, ProcedureId};

pub fn conflict(catalog: &Catalog, conflict: &Conflict) -> Value {
    let tables: Vec<String> = conflict
        .tables()
        .iter()
        .map(|&t| catalog.table_name(t))
        .collect();
    json!({
        "stmt0": catalog.qualified_name(conflict.stmt0),
        "stmt1": catalog.qualified_name(conflict.stmt1),
        "tables": tables,
        "always_conflicting": conflict.always_conflicting,
    })
}

pub fn conflict_set(catalog: &Catalog, set: &ConflictSet) -> Value {
    let conflicts: Vec<Value> = set.conflicts.iter().map(|c| conflict(catalog, c)).collect();
    json!({
        "subject": catalog.procedure_name(set.subject),
        "partner": catalog.procedure_name(set.partner),
        "kind": set.kind.as_str(),
        "conflicts": conflicts,
    })
}

/// Renders a stored report, optionally narrowed to one subject procedure.
pub fn report(
    catalog: &Catalog,
    report: &ConflictReport,
    fingerprint: Option<&str>,
    subject: Option<ProcedureId>,
) -> Value {
    let analyzed: Vec<String> = report
        .analyzed()
        .iter()
        .map(|&p| catalog.procedure_name(p))
        .collect();
    let sets: Vec<Value> = match subject {
        Some(p) => report.sets_for(p).map(|s| conflict_set(catalog, s)).collect(),
        None => report.sets().iter().map(|s| conflict_set(catalog, s)).collect(),
    };
    json!({
        "fingerprint": fingerprint,
        "analyzed": analyzed,
        "sets": sets,
    })
}

pub fn verdict(catalog: &Catalog, p0: ProcedureId, p1: ProcedureId, verdict: &PairVerdict<'_>) -> Value {
    let (label, conflicts) = match verdict {
        PairVerdict::Independent => ("independent", Vec::new()),
        PairVerdict::Conditional(list) => (
            "conditional",
            list.iter().map(|c| conflict(catalog, c)).collect(),
        ),
        PairVerdict::AlwaysConflicting => ("always_conflicting", Vec::new()),
    };
    json!({
        "procedure0": catalog.procedure_name(p0),
        "procedure1": catalog.procedure_name(p1),
        "verdict": label,
        "conflicts": conflicts,
    })
}
