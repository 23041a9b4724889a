//! Core error types for procset-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! configuration failures detected while flattening schema facts into a
//! [`Catalog`](crate::catalog::Catalog), plus data-model invariants.

use thiserror::Error;

/// Core errors produced by the procset-core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Two tables share the same name.
    #[error("duplicate table: '{name}'")]
    DuplicateTable { name: String },

    /// A table declares the same column twice.
    #[error("duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    /// Two procedures share the same name.
    #[error("duplicate procedure: '{name}'")]
    DuplicateProcedure { name: String },

    /// A procedure declares the same statement name twice.
    #[error("duplicate statement '{statement}' in procedure '{procedure}'")]
    DuplicateStatement { procedure: String, statement: String },

    /// A primary-key column is not one of the table's columns.
    #[error("primary key column '{column}' is not a column of table '{table}'")]
    UnknownKeyColumn { table: String, column: String },

    /// A statement plan names a table that is not in the schema.
    #[error("statement '{statement}' references unknown table '{table}'")]
    UnknownTable { statement: String, table: String },

    /// A column reference is not of the form `table.column`.
    #[error("statement '{statement}' has unqualified column reference '{reference}'")]
    UnqualifiedColumn { statement: String, reference: String },

    /// A qualified column reference does not resolve to a known column.
    #[error("statement '{statement}' references unknown column '{reference}'")]
    UnknownColumn { statement: String, reference: String },

    /// A table, column, procedure or statement name contains `.`, which
    /// would make qualified names ambiguous.
    #[error("{kind} name '{name}' must not contain '.'")]
    DottedName { kind: &'static str, name: String },

    /// A conflict was constructed without any shared table.
    #[error("conflict {stmt0}--{stmt1} has no shared table")]
    EmptyConflictTables { stmt0: u32, stmt1: u32 },
}
