//! Flat, immutable catalog snapshot consumed by the conflict analysis.
//!
//! A [`Catalog`] is a set of plain value records (tables, columns,
//! statements, procedures) linked only by stable IDs. It is built once from
//! [`SchemaFacts`](crate::facts::SchemaFacts) and never mutated afterwards,
//! so analysis code never walks a live or cyclic object graph.

use std::collections::BTreeSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::id::{ColumnId, ProcedureId, StatementId, TableId};

/// The kind of SQL statement, as reported by the query planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl QueryKind {
    /// Returns true for INSERT, UPDATE and DELETE.
    pub fn is_write(self) -> bool {
        !matches!(self, QueryKind::Select)
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryKind::Select => "SELECT",
            QueryKind::Insert => "INSERT",
            QueryKind::Update => "UPDATE",
            QueryKind::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// A table and its primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub id: TableId,
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<ColumnId>,
    /// Primary-key columns. Empty when the table declares no key.
    pub primary_key: BTreeSet<ColumnId>,
}

/// A column and its owning table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub id: ColumnId,
    pub name: String,
    pub table: TableId,
}

/// The plan shape of a statement, precomputed by the query planner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanShape {
    /// Tables referenced anywhere in the statement.
    pub tables: BTreeSet<TableId>,
    /// Predicate and set-clause columns.
    pub referenced_columns: BTreeSet<ColumnId>,
    /// Columns written by an UPDATE.
    pub modified_columns: BTreeSet<ColumnId>,
    /// Columns produced by a SELECT.
    pub output_columns: BTreeSet<ColumnId>,
    /// The plan contains an aggregate operator.
    pub aggregate: bool,
    /// The predicate selects a range rather than point lookups.
    pub range_predicate: bool,
}

impl PlanShape {
    /// A join is any statement touching more than one table.
    pub fn is_join(&self) -> bool {
        self.tables.len() > 1
    }

    /// The only referenced table, if exactly one is referenced.
    pub fn sole_table(&self) -> Option<TableId> {
        if self.tables.len() == 1 {
            self.tables.iter().next().copied()
        } else {
            None
        }
    }
}

/// A SQL statement owned by a procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementDef {
    pub id: StatementId,
    pub name: String,
    pub procedure: ProcedureId,
    pub kind: QueryKind,
    /// `None` when the planner could not classify the statement.
    pub plan: Option<PlanShape>,
}

/// A stored procedure and its statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureDef {
    pub id: ProcedureId,
    pub name: String,
    /// Statements in declaration order.
    pub statements: Vec<StatementId>,
    pub system: bool,
    pub mapreduce: bool,
}

impl ProcedureDef {
    /// System and map-reduce procedures never take part in conflict analysis.
    pub fn is_internal(&self) -> bool {
        self.system || self.mapreduce
    }
}

/// Immutable snapshot of every table, column, statement and procedure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub(crate) tables: Vec<TableDef>,
    pub(crate) columns: Vec<ColumnDef>,
    pub(crate) statements: Vec<StatementDef>,
    pub(crate) procedures: Vec<ProcedureDef>,
    pub(crate) table_names: IndexMap<String, TableId>,
    pub(crate) procedure_names: IndexMap<String, ProcedureId>,
}

impl Catalog {
    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn statements(&self) -> &[StatementDef] {
        &self.statements
    }

    pub fn procedures(&self) -> &[ProcedureDef] {
        &self.procedures
    }

    pub fn table(&self, id: TableId) -> Option<&TableDef> {
        self.tables.get(id.index())
    }

    pub fn column(&self, id: ColumnId) -> Option<&ColumnDef> {
        self.columns.get(id.index())
    }

    pub fn statement(&self, id: StatementId) -> Option<&StatementDef> {
        self.statements.get(id.index())
    }

    pub fn procedure(&self, id: ProcedureId) -> Option<&ProcedureDef> {
        self.procedures.get(id.index())
    }

    pub fn table_by_name(&self, name: &str) -> Option<TableId> {
        self.table_names.get(name).copied()
    }

    pub fn procedure_by_name(&self, name: &str) -> Option<ProcedureId> {
        self.procedure_names.get(name).copied()
    }

    /// Looks up a statement by procedure name and statement name.
    pub fn statement_by_name(&self, procedure: &str, statement: &str) -> Option<StatementId> {
        let proc_id = self.procedure_by_name(procedure)?;
        let proc_def = self.procedure(proc_id)?;
        proc_def
            .statements
            .iter()
            .copied()
            .find(|&id| self.statement(id).is_some_and(|s| s.name == statement))
    }

    /// Looks up a statement by its qualified `Procedure.Statement` name.
    pub fn statement_by_qualified_name(&self, qualified: &str) -> Option<StatementId> {
        let (procedure, statement) = qualified.split_once('.')?;
        self.statement_by_name(procedure, statement)
    }

    /// Returns `Procedure.Statement` for a statement, or the raw id if unknown.
    pub fn qualified_name(&self, id: StatementId) -> String {
        match self.statement(id) {
            Some(stmt) => match self.procedure(stmt.procedure) {
                Some(proc_def) => format!("{}.{}", proc_def.name, stmt.name),
                None => stmt.name.clone(),
            },
            None => format!("#{}", id),
        }
    }

    /// Name of a table, or the raw id if unknown.
    pub fn table_name(&self, id: TableId) -> String {
        self.table(id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| format!("#{}", id))
    }

    /// Name of a procedure, or the raw id if unknown.
    pub fn procedure_name(&self, id: ProcedureId) -> String {
        self.procedure(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("#{}", id))
    }

    /// Qualified `table.column` name, or the raw id if unknown.
    pub fn column_name(&self, id: ColumnId) -> String {
        match self.column(id) {
            Some(col) => format!("{}.{}", self.table_name(col.table), col.name),
            None => format!("#{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{ProcedureFacts, SchemaFacts, StatementFacts, TableFacts};

    fn bank() -> Catalog {
        SchemaFacts {
            tables: vec![TableFacts::new("accounts", &["id", "balance"], &["id"])],
            procedures: vec![
                ProcedureFacts::new("Credit").statement(
                    StatementFacts::select("getBalance")
                        .tables(&["accounts"])
                        .referenced(&["accounts.id"])
                        .output(&["accounts.balance"]),
                ),
                ProcedureFacts::new("Debit").statement(
                    StatementFacts::update("setBalance")
                        .tables(&["accounts"])
                        .referenced(&["accounts.id"])
                        .modified(&["accounts.balance"]),
                ),
            ],
        }
        .into_catalog()
        .unwrap()
    }

    #[test]
    fn query_kind_write_classification() {
        assert!(!QueryKind::Select.is_write());
        assert!(QueryKind::Insert.is_write());
        assert!(QueryKind::Update.is_write());
        assert!(QueryKind::Delete.is_write());
    }

    #[test]
    fn query_kind_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&QueryKind::Delete).unwrap(), "\"DELETE\"");
        let kind: QueryKind = serde_json::from_str("\"UPDATE\"").unwrap();
        assert_eq!(kind, QueryKind::Update);
    }

    #[test]
    fn plan_shape_join_and_sole_table() {
        let mut plan = PlanShape::default();
        assert_eq!(plan.sole_table(), None);
        plan.tables.insert(TableId(0));
        assert!(!plan.is_join());
        assert_eq!(plan.sole_table(), Some(TableId(0)));
        plan.tables.insert(TableId(1));
        assert!(plan.is_join());
        assert_eq!(plan.sole_table(), None);
    }

    #[test]
    fn lookups_by_name() {
        let catalog = bank();
        let credit = catalog.procedure_by_name("Credit").unwrap();
        assert_eq!(catalog.procedure(credit).unwrap().name, "Credit");
        let stmt = catalog.statement_by_name("Debit", "setBalance").unwrap();
        assert_eq!(catalog.statement(stmt).unwrap().kind, QueryKind::Update);
        assert_eq!(catalog.statement_by_qualified_name("Debit.setBalance"), Some(stmt));
        assert_eq!(catalog.statement_by_qualified_name("Debit"), None);
        assert_eq!(catalog.statement_by_name("Credit", "setBalance"), None);
    }

    #[test]
    fn qualified_names() {
        let catalog = bank();
        let stmt = catalog.statement_by_name("Credit", "getBalance").unwrap();
        assert_eq!(catalog.qualified_name(stmt), "Credit.getBalance");
        assert_eq!(catalog.qualified_name(StatementId(99)), "#99");
        let balance = catalog.table(TableId(0)).unwrap().columns[1];
        assert_eq!(catalog.column_name(balance), "accounts.balance");
    }

    #[test]
    fn catalog_json_roundtrip_preserves_lookups() {
        let catalog = bank();
        let json = serde_json::to_string(&catalog).unwrap();
        let back: Catalog = serde_json::from_str(&json).unwrap();
        assert_eq!(catalog, back);
        assert_eq!(back.table_by_name("accounts"), Some(TableId(0)));
    }
}
