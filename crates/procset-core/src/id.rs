//! Stable ID newtypes for catalog entities.
//!
//! All IDs are distinct newtype wrappers over `u32`, providing type safety
//! so that a `TableId` cannot be accidentally used where a `ColumnId` is
//! expected. Each ID is a dense index into the owning [`Catalog`]'s vectors,
//! assigned in input order.
//!
//! [`Catalog`]: crate::catalog::Catalog

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stored procedure identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcedureId(pub u32);

/// Statement identity. Unique across the whole catalog, not per procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatementId(pub u32);

/// Table identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableId(pub u32);

/// Column identity. Unique across the whole catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnId(pub u32);

// Display implementations -- just print the inner value.

impl fmt::Display for ProcedureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StatementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ProcedureId {
    /// Position of this procedure in the catalog's procedure vector.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl StatementId {
    /// Position of this statement in the catalog's statement vector.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TableId {
    /// Position of this table in the catalog's table vector.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ColumnId {
    /// Position of this column in the catalog's column vector.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}
