//! Schema facts input format and its flattening into a [`Catalog`].
//!
//! [`SchemaFacts`] is what the schema registry and query planner hand over:
//! tables with their primary keys, and procedures with per-statement plan
//! shapes. Everything is referenced by name; columns use the qualified
//! `table.column` form. [`SchemaFacts::into_catalog`] resolves every name to
//! a stable ID and rejects inconsistent input with a [`CoreError`].

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::catalog::{
    Catalog, ColumnDef, PlanShape, ProcedureDef, QueryKind, StatementDef, TableDef,
};
use crate::error::CoreError;
use crate::id::{ColumnId, ProcedureId, StatementId, TableId};

/// Everything the analysis needs to know about a database schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaFacts {
    #[serde(default)]
    pub tables: Vec<TableFacts>,
    #[serde(default)]
    pub procedures: Vec<ProcedureFacts>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableFacts {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub primary_key: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureFacts {
    pub name: String,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub mapreduce: bool,
    #[serde(default)]
    pub statements: Vec<StatementFacts>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementFacts {
    pub name: String,
    pub kind: QueryKind,
    #[serde(default)]
    pub plan: Option<PlanFacts>,
}

/// Planner output for one statement, with names instead of IDs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanFacts {
    #[serde(default)]
    pub tables: Vec<String>,
    #[serde(default)]
    pub referenced_columns: Vec<String>,
    #[serde(default)]
    pub modified_columns: Vec<String>,
    #[serde(default)]
    pub output_columns: Vec<String>,
    #[serde(default)]
    pub aggregate: bool,
    #[serde(default)]
    pub range_predicate: bool,
}

impl TableFacts {
    pub fn new(name: &str, columns: &[&str], primary_key: &[&str]) -> Self {
        TableFacts {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            primary_key: primary_key.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl ProcedureFacts {
    pub fn new(name: &str) -> Self {
        ProcedureFacts {
            name: name.to_string(),
            system: false,
            mapreduce: false,
            statements: Vec::new(),
        }
    }

    pub fn system(mut self) -> Self {
        self.system = true;
        self
    }

    pub fn mapreduce(mut self) -> Self {
        self.mapreduce = true;
        self
    }

    pub fn statement(mut self, stmt: StatementFacts) -> Self {
        self.statements.push(stmt);
        self
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

impl StatementFacts {
    /// A statement of the given kind with an empty plan.
    pub fn new(name: &str, kind: QueryKind) -> Self {
        StatementFacts {
            name: name.to_string(),
            kind,
            plan: Some(PlanFacts::default()),
        }
    }

    pub fn select(name: &str) -> Self {
        Self::new(name, QueryKind::Select)
    }

    pub fn insert(name: &str) -> Self {
        Self::new(name, QueryKind::Insert)
    }

    pub fn update(name: &str) -> Self {
        Self::new(name, QueryKind::Update)
    }

    pub fn delete(name: &str) -> Self {
        Self::new(name, QueryKind::Delete)
    }

    /// Drops the plan, modelling a statement the planner could not classify.
    pub fn unplanned(mut self) -> Self {
        self.plan = None;
        self
    }

    fn plan_mut(&mut self) -> &mut PlanFacts {
        self.plan.get_or_insert_with(PlanFacts::default)
    }

    pub fn tables(mut self, tables: &[&str]) -> Self {
        self.plan_mut().tables = owned(tables);
        self
    }

    pub fn referenced(mut self, columns: &[&str]) -> Self {
        self.plan_mut().referenced_columns = owned(columns);
        self
    }

    pub fn modified(mut self, columns: &[&str]) -> Self {
        self.plan_mut().modified_columns = owned(columns);
        self
    }

    pub fn output(mut self, columns: &[&str]) -> Self {
        self.plan_mut().output_columns = owned(columns);
        self
    }

    pub fn aggregate(mut self) -> Self {
        self.plan_mut().aggregate = true;
        self
    }

    pub fn range_predicate(mut self) -> Self {
        self.plan_mut().range_predicate = true;
        self
    }
}

impl SchemaFacts {
    /// Parses schema facts from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Flattens the facts into an immutable [`Catalog`] snapshot.
    ///
    /// IDs are assigned in input order. Statements without a plan are kept
    /// with `plan: None`; whether that is fatal is decided by the analysis.
    pub fn into_catalog(&self) -> Result<Catalog, CoreError> {
        let mut catalog = Catalog::default();
        // (table, column name) -> column
        let mut column_index: IndexMap<(TableId, String), ColumnId> = IndexMap::new();

        for table in &self.tables {
            undotted("table", &table.name)?;
            if catalog.table_names.contains_key(&table.name) {
                return Err(CoreError::DuplicateTable {
                    name: table.name.clone(),
                });
            }
            let table_id = TableId(catalog.tables.len() as u32);
            let mut columns = Vec::with_capacity(table.columns.len());
            for column in &table.columns {
                undotted("column", column)?;
                let key = (table_id, column.clone());
                if column_index.contains_key(&key) {
                    return Err(CoreError::DuplicateColumn {
                        table: table.name.clone(),
                        column: column.clone(),
                    });
                }
                let column_id = ColumnId(catalog.columns.len() as u32);
                catalog.columns.push(ColumnDef {
                    id: column_id,
                    name: column.clone(),
                    table: table_id,
                });
                column_index.insert(key, column_id);
                columns.push(column_id);
            }

            let mut primary_key = BTreeSet::new();
            for column in &table.primary_key {
                match column_index.get(&(table_id, column.clone())) {
                    Some(&id) => {
                        primary_key.insert(id);
                    }
                    None => {
                        return Err(CoreError::UnknownKeyColumn {
                            table: table.name.clone(),
                            column: column.clone(),
                        })
                    }
                }
            }

            catalog.table_names.insert(table.name.clone(), table_id);
            catalog.tables.push(TableDef {
                id: table_id,
                name: table.name.clone(),
                columns,
                primary_key,
            });
        }

        for procedure in &self.procedures {
            undotted("procedure", &procedure.name)?;
            if catalog.procedure_names.contains_key(&procedure.name) {
                return Err(CoreError::DuplicateProcedure {
                    name: procedure.name.clone(),
                });
            }
            let proc_id = ProcedureId(catalog.procedures.len() as u32);
            let mut seen = HashSet::new();
            let mut statements = Vec::with_capacity(procedure.statements.len());

            for stmt in &procedure.statements {
                undotted("statement", &stmt.name)?;
                let qualified = format!("{}.{}", procedure.name, stmt.name);
                if !seen.insert(stmt.name.as_str()) {
                    return Err(CoreError::DuplicateStatement {
                        procedure: procedure.name.clone(),
                        statement: stmt.name.clone(),
                    });
                }
                let plan = match &stmt.plan {
                    Some(plan) => Some(resolve_plan(&catalog, &column_index, &qualified, plan)?),
                    None => None,
                };
                let stmt_id = StatementId(catalog.statements.len() as u32);
                catalog.statements.push(StatementDef {
                    id: stmt_id,
                    name: stmt.name.clone(),
                    procedure: proc_id,
                    kind: stmt.kind,
                    plan,
                });
                statements.push(stmt_id);
            }

            catalog.procedure_names.insert(procedure.name.clone(), proc_id);
            catalog.procedures.push(ProcedureDef {
                id: proc_id,
                name: procedure.name.clone(),
                statements,
                system: procedure.system,
                mapreduce: procedure.mapreduce,
            });
        }

        Ok(catalog)
    }
}

/// Qualified names join with `.`, so no component may contain one.
fn undotted(kind: &'static str, name: &str) -> Result<(), CoreError> {
    if name.contains('.') {
        return Err(CoreError::DottedName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

fn resolve_plan(
    catalog: &Catalog,
    column_index: &IndexMap<(TableId, String), ColumnId>,
    statement: &str,
    plan: &PlanFacts,
) -> Result<PlanShape, CoreError> {
    let mut tables = BTreeSet::new();
    for name in &plan.tables {
        let id = catalog
            .table_by_name(name)
            .ok_or_else(|| CoreError::UnknownTable {
                statement: statement.to_string(),
                table: name.clone(),
            })?;
        tables.insert(id);
    }

    let resolve_columns = |refs: &[String]| -> Result<BTreeSet<ColumnId>, CoreError> {
        let mut out = BTreeSet::new();
        for reference in refs {
            let (table, column) =
                reference
                    .split_once('.')
                    .ok_or_else(|| CoreError::UnqualifiedColumn {
                        statement: statement.to_string(),
                        reference: reference.clone(),
                    })?;
            let id = catalog
                .table_by_name(table)
                .and_then(|t| column_index.get(&(t, column.to_string())).copied())
                .ok_or_else(|| CoreError::UnknownColumn {
                    statement: statement.to_string(),
                    reference: reference.clone(),
                })?;
            out.insert(id);
        }
        Ok(out)
    };

    Ok(PlanShape {
        tables,
        referenced_columns: resolve_columns(&plan.referenced_columns)?,
        modified_columns: resolve_columns(&plan.modified_columns)?,
        output_columns: resolve_columns(&plan.output_columns)?,
        aggregate: plan.aggregate,
        range_predicate: plan.range_predicate,
    })
}
