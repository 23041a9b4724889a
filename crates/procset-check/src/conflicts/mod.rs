//! Conflict set calculator.
//!
//! For every ordered pair of analyzed procedures `(p0, p1)`, including
//! `p0 == p1`, compares p0's reads against p1's writes (read-write) and p0's
//! writes against p1's writes (write-write). The opposite read-write
//! direction falls out of visiting `(p1, p0)`.
//!
//! Exclusions are registered on a [`CalculatorBuilder`] and frozen by
//! [`CalculatorBuilder::build`]; a [`ConflictSetCalculator`] cannot be
//! reconfigured. [`ConflictSetCalculator::run`] is pure: it returns a
//! [`ConflictReport`] and leaves publishing to the caller.

pub mod rules;

pub use rules::{escalates, read_write_conflict, write_write_conflict};

use rayon::prelude::*;
use tracing::{debug, info, trace};

use procset_core::{Catalog, ConflictKind, ConflictReport, ConflictSet};

use crate::classify::{classify, ClassifiedProcedure};
use crate::config::{AnalysisConfig, IgnoreList};
use crate::error::AnalysisError;

/// Collects exclusions before a run.
#[derive(Debug, Clone)]
pub struct CalculatorBuilder<'a> {
    catalog: &'a Catalog,
    ignore: IgnoreList,
    parallel: bool,
}

impl<'a> CalculatorBuilder<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        CalculatorBuilder {
            catalog,
            ignore: IgnoreList::default(),
            parallel: true,
        }
    }

    /// Starts from a resolved [`AnalysisConfig`].
    pub fn from_config(catalog: &'a Catalog, config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        Ok(CalculatorBuilder {
            catalog,
            ignore: config.resolve(catalog)?,
            parallel: config.parallel,
        })
    }

    /// Excludes a procedure by name from the analysis.
    pub fn ignore_procedure(mut self, name: &str) -> Result<Self, AnalysisError> {
        self.ignore.add_procedure(self.catalog, name)?;
        Ok(self)
    }

    /// Excludes a statement by its qualified `Procedure.Statement` name.
    pub fn ignore_statement(mut self, qualified: &str) -> Result<Self, AnalysisError> {
        self.ignore.add_statement(self.catalog, qualified)?;
        Ok(self)
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Freezes the configuration.
    pub fn build(self) -> ConflictSetCalculator<'a> {
        ConflictSetCalculator {
            catalog: self.catalog,
            ignore: self.ignore,
            parallel: self.parallel,
        }
    }
}

/// Computes the conflict relation for a catalog snapshot.
#[derive(Debug, Clone)]
pub struct ConflictSetCalculator<'a> {
    catalog: &'a Catalog,
    ignore: IgnoreList,
    parallel: bool,
}

impl<'a> ConflictSetCalculator<'a> {
    /// A calculator with no exclusions.
    pub fn new(catalog: &'a Catalog) -> Self {
        CalculatorBuilder::new(catalog).build()
    }

    pub fn ignore_list(&self) -> &IgnoreList {
        &self.ignore
    }

    /// Classifies every procedure and computes all RW and WW conflict sets.
    ///
    /// Fails without a partial result if any analyzed statement cannot be
    /// classified.
    pub fn run(&self) -> Result<ConflictReport, AnalysisError> {
        let procedures = classify(self.catalog, &self.ignore)?;
        debug!(
            procedures = procedures.len(),
            parallel = self.parallel,
            "classified procedures"
        );

        let per_subject: Vec<Vec<ConflictSet>> = if self.parallel {
            procedures
                .par_iter()
                .map(|p0| self.check_subject(p0, &procedures))
                .collect::<Result<_, _>>()?
        } else {
            procedures
                .iter()
                .map(|p0| self.check_subject(p0, &procedures))
                .collect::<Result<_, _>>()?
        };

        let report = ConflictReport::new(
            procedures.iter().map(|p| p.id),
            per_subject.into_iter().flatten().collect(),
        );
        info!(
            procedures = report.analyzed().len(),
            sets = report.sets().len(),
            conflicts = report.conflict_count(),
            "conflict analysis complete"
        );
        Ok(report)
    }

    /// All conflict sets with `p0` as subject.
    fn check_subject(
        &self,
        p0: &ClassifiedProcedure,
        procedures: &[ClassifiedProcedure],
    ) -> Result<Vec<ConflictSet>, AnalysisError> {
        let mut sets = Vec::new();
        for p1 in procedures {
            let rw = self.check_read_write(p0, p1)?;
            if !rw.conflicts.is_empty() {
                debug!(
                    "**RW-CONFLICT** {} <-> {}",
                    self.catalog.procedure_name(p0.id),
                    self.catalog.procedure_name(p1.id)
                );
                sets.push(rw);
            }

            let ww = self.check_write_write(p0, p1)?;
            if !ww.conflicts.is_empty() {
                debug!(
                    "**WW-CONFLICT** {} <-> {}",
                    self.catalog.procedure_name(p0.id),
                    self.catalog.procedure_name(p1.id)
                );
                sets.push(ww);
            }
        }
        Ok(sets)
    }

    /// p0 reads vs p1 writes.
    pub fn check_read_write(
        &self,
        p0: &ClassifiedProcedure,
        p1: &ClassifiedProcedure,
    ) -> Result<ConflictSet, AnalysisError> {
        let mut set = ConflictSet::new(p0.id, p1.id, ConflictKind::ReadWrite);
        for read in &p0.reads {
            for write in &p1.writes {
                if let Some(conflict) = read_write_conflict(read, write)? {
                    trace!(
                        "RW {} <-> {} CONFLICTS",
                        self.catalog.qualified_name(read.id),
                        self.catalog.qualified_name(write.id)
                    );
                    set.conflicts.push(conflict);
                }
            }
        }
        Ok(set)
    }

    /// p0 writes vs p1 writes.
    pub fn check_write_write(
        &self,
        p0: &ClassifiedProcedure,
        p1: &ClassifiedProcedure,
    ) -> Result<ConflictSet, AnalysisError> {
        let mut set = ConflictSet::new(p0.id, p1.id, ConflictKind::WriteWrite);
        for w0 in &p0.writes {
            for w1 in &p1.writes {
                if let Some(conflict) = write_write_conflict(w0, w1)? {
                    trace!(
                        always = conflict.always_conflicting,
                        "WW {} <-> {} CONFLICTS",
                        self.catalog.qualified_name(w0.id),
                        self.catalog.qualified_name(w1.id)
                    );
                    set.conflicts.push(conflict);
                }
            }
        }
        Ok(set)
    }
}
