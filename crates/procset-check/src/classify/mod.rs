//! Procedure classifier.
//!
//! Splits every analyzable procedure's statements into a read set (SELECT)
//! and a write set (INSERT, UPDATE, DELETE), turning each statement's plan
//! shape into an [`Access`] value. System and map-reduce procedures, ignored
//! procedures and ignored statements are left out. Any analyzed statement
//! without usable plan information fails the whole classification.

pub mod access;

pub use access::{Access, ClassifiedStatement, ReadShape};

use std::collections::HashSet;

use procset_core::{Catalog, PlanShape, ProcedureId, QueryKind, StatementDef};

use crate::config::IgnoreList;
use crate::error::AnalysisError;

/// A procedure's statements, partitioned by access mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedProcedure {
    pub id: ProcedureId,
    pub reads: Vec<ClassifiedStatement>,
    pub writes: Vec<ClassifiedStatement>,
}

/// Classifies every non-internal, non-ignored procedure in catalog order.
pub fn classify(
    catalog: &Catalog,
    ignore: &IgnoreList,
) -> Result<Vec<ClassifiedProcedure>, AnalysisError> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for proc_def in catalog.procedures() {
        if !seen.insert(proc_def.id) {
            return Err(AnalysisError::DuplicateProcedure { id: proc_def.id });
        }
        if proc_def.is_internal() || ignore.contains_procedure(proc_def.id) {
            tracing::trace!(procedure = %proc_def.name, "skipping procedure");
            continue;
        }

        let mut classified = ClassifiedProcedure {
            id: proc_def.id,
            reads: Vec::new(),
            writes: Vec::new(),
        };
        for &stmt_id in &proc_def.statements {
            if ignore.contains_statement(stmt_id) {
                continue;
            }
            let stmt = catalog
                .statement(stmt_id)
                .ok_or_else(|| AnalysisError::MissingPlan {
                    statement: catalog.qualified_name(stmt_id),
                })?;
            let statement = classify_statement(catalog, stmt)?;
            if stmt.kind.is_write() {
                classified.writes.push(statement);
            } else {
                classified.reads.push(statement);
            }
        }
        out.push(classified);
    }

    Ok(out)
}

/// Derives the [`ClassifiedStatement`] for one statement.
pub fn classify_statement(
    catalog: &Catalog,
    stmt: &StatementDef,
) -> Result<ClassifiedStatement, AnalysisError> {
    let name = || catalog.qualified_name(stmt.id);

    let plan: &PlanShape = stmt
        .plan
        .as_ref()
        .ok_or_else(|| AnalysisError::MissingPlan { statement: name() })?;
    if plan.tables.is_empty() {
        return Err(AnalysisError::NoTables { statement: name() });
    }
    if let Some(&table) = plan.tables.iter().find(|&&t| catalog.table(t).is_none()) {
        return Err(AnalysisError::UnknownTable {
            statement: name(),
            table,
        });
    }

    let access = match stmt.kind {
        QueryKind::Select => Access::Read {
            observed: plan
                .referenced_columns
                .union(&plan.output_columns)
                .copied()
                .collect(),
            shape: ReadShape {
                join: plan.is_join(),
                aggregate: plan.aggregate,
                range: plan.range_predicate,
            },
        },
        QueryKind::Insert => Access::Insert,
        QueryKind::Update => {
            if plan.modified_columns.is_empty() {
                return Err(AnalysisError::NoModifiedColumns { statement: name() });
            }
            Access::Update {
                modified: plan.modified_columns.clone(),
                key_covered: key_covered(catalog, plan, name)?,
            }
        }
        QueryKind::Delete => Access::Delete {
            key_covered: key_covered(catalog, plan, name)?,
        },
    };

    Ok(ClassifiedStatement {
        id: stmt.id,
        tables: plan.tables.clone(),
        referenced: plan.referenced_columns.clone(),
        access,
    })
}

/// Whether the statement's referenced columns include its table's entire
/// primary key. An empty key is trivially included.
fn key_covered(
    catalog: &Catalog,
    plan: &PlanShape,
    name: impl Fn() -> String,
) -> Result<bool, AnalysisError> {
    let table = plan
        .sole_table()
        .and_then(|t| catalog.table(t))
        .ok_or_else(|| AnalysisError::UndefinedKeyCoverage {
            statement: name(),
            tables: plan.tables.len(),
        })?;
    Ok(table.primary_key.is_subset(&plan.referenced_columns))
}
