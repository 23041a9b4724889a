//! Error taxonomy for conflict analysis.
//!
//! [`AnalysisError`] splits into two classes: configuration errors, which are
//! detected before any pair is compared, and analysis errors, raised when a
//! statement lacks the plan information needed to reason about it. Both abort
//! the run; nothing is ever downgraded to "no conflict".

use procset_core::{CoreError, ProcedureId, TableId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The catalog snapshot itself is inconsistent.
    #[error("catalog error: {0}")]
    Catalog(#[source] CoreError),

    /// A rule tried to record a conflict with no shared table.
    #[error("statements {stmt0} and {stmt1} were paired without a shared table")]
    EmptyConflict { stmt0: u32, stmt1: u32 },

    /// An ignore request names a procedure that does not exist.
    #[error("cannot ignore unknown procedure '{name}'")]
    UnknownProcedure { name: String },

    /// An ignore request names a statement that does not exist.
    #[error("cannot ignore unknown statement '{name}'")]
    UnknownStatement { name: String },

    /// The same procedure identity appears twice in the input.
    #[error("procedure {id} appears more than once")]
    DuplicateProcedure { id: ProcedureId },

    /// The planner produced no plan shape for the statement.
    #[error("statement '{statement}' has no plan information")]
    MissingPlan { statement: String },

    /// The statement's plan references no table.
    #[error("statement '{statement}' references no tables")]
    NoTables { statement: String },

    /// The plan names a table missing from the catalog.
    #[error("statement '{statement}' references unknown table {table}")]
    UnknownTable { statement: String, table: TableId },

    /// A DELETE or UPDATE does not reference exactly one table, so its
    /// primary-key coverage is undefined.
    #[error("statement '{statement}' touches {tables} tables; key coverage is undefined")]
    UndefinedKeyCoverage { statement: String, tables: usize },

    /// An UPDATE whose plan lists no modified column.
    #[error("update '{statement}' modifies no columns")]
    NoModifiedColumns { statement: String },
}

impl From<CoreError> for AnalysisError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyConflictTables { stmt0, stmt1 } => {
                AnalysisError::EmptyConflict { stmt0, stmt1 }
            }
            other => AnalysisError::Catalog(other),
        }
    }
}

impl AnalysisError {
    /// True for errors caused by the input or ignore configuration rather
    /// than by an unclassifiable statement.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AnalysisError::Catalog(_)
                | AnalysisError::UnknownProcedure { .. }
                | AnalysisError::UnknownStatement { .. }
                | AnalysisError::DuplicateProcedure { .. }
        )
    }
}
