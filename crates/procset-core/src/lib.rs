//! Data model for static procedure conflict analysis.
//!
//! - [`id`]: stable ID newtypes
//! - [`catalog`]: immutable snapshot of tables, columns, statements, procedures
//! - [`facts`]: schema facts input format and flattening into a [`Catalog`]
//! - [`conflict`]: conflicts, conflict sets, and the per-run report

pub mod catalog;
pub mod conflict;
pub mod error;
pub mod facts;
pub mod id;

// Re-export commonly used types
pub use catalog::{Catalog, ColumnDef, PlanShape, ProcedureDef, QueryKind, StatementDef, TableDef};
pub use conflict::{Conflict, ConflictKind, ConflictReport, ConflictSet, PairVerdict};
pub use error::CoreError;
pub use facts::{PlanFacts, ProcedureFacts, SchemaFacts, StatementFacts, TableFacts};
pub use id::{ColumnId, ProcedureId, StatementId, TableId};
