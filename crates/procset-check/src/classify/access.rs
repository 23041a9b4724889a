//! Per-statement access description, evaluated once during classification.

use std::collections::BTreeSet;

use procset_core::{ColumnId, QueryKind, StatementId, TableId};

/// Plan-shape flags that make a read impossible to bound precisely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadShape {
    pub join: bool,
    pub aggregate: bool,
    pub range: bool,
}

impl ReadShape {
    /// True if any flag is set.
    pub fn is_unbounded(&self) -> bool {
        self.join || self.aggregate || self.range
    }
}

/// What a statement does to the tables it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Read {
        /// Referenced columns plus output columns.
        observed: BTreeSet<ColumnId>,
        shape: ReadShape,
    },
    Insert,
    Update {
        modified: BTreeSet<ColumnId>,
        key_covered: bool,
    },
    Delete {
        key_covered: bool,
    },
}

impl Access {
    pub fn kind(&self) -> QueryKind {
        match self {
            Access::Read { .. } => QueryKind::Select,
            Access::Insert => QueryKind::Insert,
            Access::Update { .. } => QueryKind::Update,
            Access::Delete { .. } => QueryKind::Delete,
        }
    }

    /// Primary-key coverage; `None` for SELECT and INSERT, where it has no
    /// meaning.
    pub fn key_covered(&self) -> Option<bool> {
        match self {
            Access::Update { key_covered, .. } | Access::Delete { key_covered } => {
                Some(*key_covered)
            }
            Access::Read { .. } | Access::Insert => None,
        }
    }
}

/// A statement reduced to the facts the conflict rules look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedStatement {
    pub id: StatementId,
    pub tables: BTreeSet<TableId>,
    /// Predicate and set-clause columns.
    pub referenced: BTreeSet<ColumnId>,
    pub access: Access,
}

impl ClassifiedStatement {
    /// Columns whose change could alter what this statement observes.
    pub fn observed(&self) -> &BTreeSet<ColumnId> {
        match &self.access {
            Access::Read { observed, .. } => observed,
            _ => &self.referenced,
        }
    }
}
