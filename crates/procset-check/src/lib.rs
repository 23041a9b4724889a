//! Static read-write / write-write conflict analysis for stored procedures.
//!
//! - [`config`]: ignore lists and run settings
//! - [`classify`]: splits procedures into read and write sets
//! - [`conflicts`]: pairwise rules and the [`ConflictSetCalculator`]
//! - [`error`]: [`AnalysisError`]

pub mod classify;
pub mod config;
pub mod conflicts;
pub mod error;

pub use classify::{classify, Access, ClassifiedProcedure, ClassifiedStatement, ReadShape};
pub use config::{AnalysisConfig, IgnoreList};
pub use conflicts::{CalculatorBuilder, ConflictSetCalculator};
pub use error::AnalysisError;
