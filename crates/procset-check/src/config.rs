//! Analysis configuration and the frozen ignore list.
//!
//! [`AnalysisConfig`] is the serializable form (a JSON file or CLI flags):
//! procedures and statements are named, statements as `Procedure.Statement`.
//! [`AnalysisConfig::resolve`] turns it into an [`IgnoreList`] of IDs against
//! a specific catalog, failing on any name that does not resolve.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use procset_core::{Catalog, ProcedureId, StatementId};

use crate::error::AnalysisError;

fn default_parallel() -> bool {
    true
}

/// User-facing analysis settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Procedure names excluded from the analysis entirely.
    #[serde(default)]
    pub ignored_procedures: Vec<String>,
    /// Qualified `Procedure.Statement` names excluded from both read and
    /// write sets.
    #[serde(default)]
    pub ignored_statements: Vec<String>,
    /// Compare procedure pairs on the rayon thread pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            ignored_procedures: Vec::new(),
            ignored_statements: Vec::new(),
            parallel: default_parallel(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Resolves every configured name against `catalog`.
    pub fn resolve(&self, catalog: &Catalog) -> Result<IgnoreList, AnalysisError> {
        let mut ignore = IgnoreList::default();
        for name in &self.ignored_procedures {
            ignore.add_procedure(catalog, name)?;
        }
        for name in &self.ignored_statements {
            ignore.add_statement(catalog, name)?;
        }
        Ok(ignore)
    }
}

/// Resolved exclusions. Immutable once handed to a calculator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList {
    procedures: BTreeSet<ProcedureId>,
    statements: BTreeSet<StatementId>,
}

impl IgnoreList {
    pub(crate) fn add_procedure(
        &mut self,
        catalog: &Catalog,
        name: &str,
    ) -> Result<ProcedureId, AnalysisError> {
        let id = catalog
            .procedure_by_name(name)
            .ok_or_else(|| AnalysisError::UnknownProcedure {
                name: name.to_string(),
            })?;
        self.procedures.insert(id);
        Ok(id)
    }

    pub(crate) fn add_statement(
        &mut self,
        catalog: &Catalog,
        qualified: &str,
    ) -> Result<StatementId, AnalysisError> {
        let id = catalog
            .statement_by_qualified_name(qualified)
            .ok_or_else(|| AnalysisError::UnknownStatement {
                name: qualified.to_string(),
            })?;
        self.statements.insert(id);
        Ok(id)
    }

    pub fn contains_procedure(&self, id: ProcedureId) -> bool {
        self.procedures.contains(&id)
    }

    pub fn contains_statement(&self, id: StatementId) -> bool {
        self.statements.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty() && self.statements.is_empty()
    }
}
