//! Conflict relation data model.
//!
//! A [`Conflict`] pairs two statements that touch at least one common table.
//! Conflicts between two procedures are grouped into a [`ConflictSet`] per
//! (subject, partner, kind), and a whole analysis run yields one
//! [`ConflictReport`]. Read-write sets are directional: the subject reads and
//! the partner writes. Write-write sets are stored once from each side.
//!
//! The report is kept in canonical order so that two runs over the same
//! catalog serialize to identical bytes.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::CoreError;
use crate::id::{ProcedureId, StatementId, TableId};

/// Which kind of access pattern a conflict set describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConflictKind {
    /// Subject reads, partner writes.
    ReadWrite,
    /// Both sides write.
    WriteWrite,
}

impl ConflictKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConflictKind::ReadWrite => "RW",
            ConflictKind::WriteWrite => "WW",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RW" => Some(ConflictKind::ReadWrite),
            "WW" => Some(ConflictKind::WriteWrite),
            _ => None,
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two statements whose read/write sets overlap on at least one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub stmt0: StatementId,
    pub stmt1: StatementId,
    tables: SmallVec<[TableId; 2]>,
    pub always_conflicting: bool,
}

impl Conflict {
    /// Builds a conflict over the given shared tables.
    ///
    /// Returns [`CoreError::EmptyConflictTables`] if `tables` is empty.
    pub fn new(
        stmt0: StatementId,
        stmt1: StatementId,
        tables: impl IntoIterator<Item = TableId>,
        always_conflicting: bool,
    ) -> Result<Self, CoreError> {
        let mut tables: SmallVec<[TableId; 2]> = tables.into_iter().collect();
        if tables.is_empty() {
            return Err(CoreError::EmptyConflictTables {
                stmt0: stmt0.0,
                stmt1: stmt1.0,
            });
        }
        tables.sort_unstable();
        tables.dedup();
        Ok(Conflict {
            stmt0,
            stmt1,
            tables,
            always_conflicting,
        })
    }

    /// Tables referenced by both statements, ascending. Never empty.
    pub fn tables(&self) -> &[TableId] {
        &self.tables
    }

    fn sort_key(&self) -> (StatementId, StatementId) {
        (self.stmt0, self.stmt1)
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}--{}", self.stmt0, self.stmt1)
    }
}

/// All conflicts of one kind between a subject procedure and a partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictSet {
    pub subject: ProcedureId,
    pub partner: ProcedureId,
    pub kind: ConflictKind,
    pub conflicts: Vec<Conflict>,
}

impl ConflictSet {
    pub fn new(subject: ProcedureId, partner: ProcedureId, kind: ConflictKind) -> Self {
        ConflictSet {
            subject,
            partner,
            kind,
            conflicts: Vec::new(),
        }
    }

    /// True if any conflict in the set must be treated as unconditional.
    pub fn has_always_conflicting(&self) -> bool {
        self.conflicts.iter().any(|c| c.always_conflicting)
    }

    fn key(&self) -> (ProcedureId, ProcedureId, ConflictKind) {
        (self.subject, self.partner, self.kind)
    }
}

/// Answer to "may these two procedures run concurrently?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairVerdict<'a> {
    /// No RW or WW conflict exists between the two procedures.
    Independent,
    /// Conflicts exist, but none is unconditional; the scheduler may refine
    /// them using the listed statement pairs.
    Conditional(Vec<&'a Conflict>),
    /// At least one conflict is unconditional.
    AlwaysConflicting,
}

/// The complete conflict relation produced by one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    analyzed: Vec<ProcedureId>,
    sets: Vec<ConflictSet>,
}

impl ConflictReport {
    /// Builds a report in canonical order.
    ///
    /// Empty sets are dropped; sets are sorted by (subject, partner, kind)
    /// and conflicts within a set by (stmt0, stmt1).
    pub fn new(analyzed: impl IntoIterator<Item = ProcedureId>, sets: Vec<ConflictSet>) -> Self {
        let mut analyzed: Vec<ProcedureId> = analyzed.into_iter().collect();
        analyzed.sort_unstable();
        analyzed.dedup();

        let mut sets: Vec<ConflictSet> = sets
            .into_iter()
            .filter(|s| !s.conflicts.is_empty())
            .map(|mut s| {
                s.conflicts.sort_by_key(Conflict::sort_key);
                s
            })
            .collect();
        sets.sort_by_key(ConflictSet::key);

        ConflictReport { analyzed, sets }
    }

    /// Procedures covered by the run, including those without conflicts.
    pub fn analyzed(&self) -> &[ProcedureId] {
        &self.analyzed
    }

    pub fn sets(&self) -> &[ConflictSet] {
        &self.sets
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Total number of conflicts across all sets.
    pub fn conflict_count(&self) -> usize {
        self.sets.iter().map(|s| s.conflicts.len()).sum()
    }

    /// All conflict sets whose subject is `subject`.
    pub fn sets_for(&self, subject: ProcedureId) -> impl Iterator<Item = &ConflictSet> {
        self.sets.iter().filter(move |s| s.subject == subject)
    }

    fn find(
        &self,
        subject: ProcedureId,
        partner: ProcedureId,
        kind: ConflictKind,
    ) -> Option<&ConflictSet> {
        self.sets
            .binary_search_by_key(&(subject, partner, kind), ConflictSet::key)
            .ok()
            .map(|i| &self.sets[i])
    }

    /// Conflicts where `subject` reads what `partner` writes.
    pub fn read_write(&self, subject: ProcedureId, partner: ProcedureId) -> Option<&ConflictSet> {
        self.find(subject, partner, ConflictKind::ReadWrite)
    }

    /// Conflicts where both procedures write.
    pub fn write_write(&self, subject: ProcedureId, partner: ProcedureId) -> Option<&ConflictSet> {
        self.find(subject, partner, ConflictKind::WriteWrite)
    }

    /// Decides whether `p0` and `p1` may run concurrently.
    ///
    /// Considers both RW directions and both WW sets, so the answer does not
    /// depend on argument order. Mirrored WW conflicts are listed once, from
    /// `p0`'s side when that set exists.
    pub fn verdict(&self, p0: ProcedureId, p1: ProcedureId) -> PairVerdict<'_> {
        let ww_forward = self.write_write(p0, p1);
        let ww_reverse = if p0 == p1 { None } else { self.write_write(p1, p0) };
        let rw = [self.read_write(p0, p1), self.read_write(p1, p0)];

        let mut all = rw.iter().chain([&ww_forward, &ww_reverse]).flatten();
        if all.any(|set| set.has_always_conflicting()) {
            return PairVerdict::AlwaysConflicting;
        }

        let listed = rw.into_iter().chain([ww_forward.or(ww_reverse)]).flatten();
        let conflicts: Vec<&Conflict> = listed.flat_map(|set| set.conflicts.iter()).collect();
        if conflicts.is_empty() {
            PairVerdict::Independent
        } else {
            PairVerdict::Conditional(conflicts)
        }
    }
}
