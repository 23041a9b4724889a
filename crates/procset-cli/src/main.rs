//! Stored procedure conflict analysis CLI.
//!
//! Provides the `procset` binary: `import` registers a schema facts file as a
//! catalog, `analyze` computes and publishes its conflict sets, `show` and
//! `lookup` read published results back. All output is JSON on stdout; logs
//! go to stderr and are filtered with `RUST_LOG`.
//!
//! Exit codes: 0 = success, 1 = configuration error, 2 = analysis error,
//! 3 = storage or I/O error.

mod render;

use std::process;

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use procset_check::{AnalysisConfig, AnalysisError, CalculatorBuilder};
use procset_core::{Catalog, SchemaFacts};
use procset_storage::{CatalogId, RegistryStore, SqliteStore};

const EXIT_CONFIG: i32 = 1;
const EXIT_ANALYSIS: i32 = 2;
const EXIT_STORAGE: i32 = 3;

/// Static read-write / write-write conflict analysis for stored procedures.
#[derive(Parser)]
#[command(name = "procset", about = "Stored procedure conflict analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Registry {
    /// Path to the registry database file.
    #[arg(long, env = "PROCSET_DB_PATH")]
    db: String,
}

#[derive(Args)]
struct Target {
    #[command(flatten)]
    registry: Registry,

    /// Catalog ID as printed by `import`.
    #[arg(long)]
    catalog: i64,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Register a schema facts file as a new catalog.
    Import {
        #[command(flatten)]
        registry: Registry,

        /// Schema facts JSON file.
        #[arg(long)]
        facts: String,

        /// Human-readable catalog name.
        #[arg(long)]
        name: String,
    },

    /// Compute and publish conflict sets for a catalog.
    Analyze {
        #[command(flatten)]
        target: Target,

        /// Analysis config JSON file.
        #[arg(long)]
        config: Option<String>,

        /// Procedure to exclude (repeatable).
        #[arg(long = "ignore-proc")]
        ignore_proc: Vec<String>,

        /// Statement to exclude, as `Procedure.Statement` (repeatable).
        #[arg(long = "ignore-stmt")]
        ignore_stmt: Vec<String>,

        /// Visit procedures on the current thread only.
        #[arg(long)]
        sequential: bool,
    },

    /// Print published conflict sets.
    Show {
        #[command(flatten)]
        target: Target,

        /// Only sets whose subject is this procedure.
        #[arg(long)]
        procedure: Option<String>,
    },

    /// Print the verdict for one procedure pair.
    Lookup {
        #[command(flatten)]
        target: Target,

        proc0: String,
        proc1: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Import {
            registry,
            facts,
            name,
        } => run_import(&registry.db, &facts, &name),
        Commands::Analyze {
            target,
            config,
            ignore_proc,
            ignore_stmt,
            sequential,
        } => run_analyze(&target, config.as_deref(), &ignore_proc, &ignore_stmt, sequential),
        Commands::Show { target, procedure } => run_show(&target, procedure.as_deref()),
        Commands::Lookup {
            target,
            proc0,
            proc1,
        } => run_lookup(&target, &proc0, &proc1),
    };
    process::exit(exit_code);
}

fn print_json(value: &Value) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize output: {}\"}}", e));
    println!("{}", json);
}

fn analysis_exit(e: &AnalysisError) -> i32 {
    if e.is_configuration() {
        EXIT_CONFIG
    } else {
        EXIT_ANALYSIS
    }
}

fn open_store(db_path: &str) -> Result<SqliteStore, i32> {
    SqliteStore::new(db_path).map_err(|e| {
        eprintln!("Error: failed to open database '{}': {}", db_path, e);
        EXIT_STORAGE
    })
}

/// Opens the registry and loads the target catalog.
fn open_target(target: &Target) -> Result<(SqliteStore, CatalogId, Catalog), i32> {
    let store = open_store(&target.registry.db)?;
    let id = CatalogId(target.catalog);
    let catalog = store.load_catalog(id).map_err(|e| {
        eprintln!("Error: failed to load catalog {}: {}", target.catalog, e);
        EXIT_STORAGE
    })?;
    Ok((store, id, catalog))
}

fn lookup_procedure(catalog: &Catalog, name: &str) -> Result<procset_core::ProcedureId, i32> {
    catalog.procedure_by_name(name).ok_or_else(|| {
        eprintln!("Error: unknown procedure '{}'", name);
        EXIT_CONFIG
    })
}

fn run_import(db_path: &str, facts_path: &str, name: &str) -> i32 {
    let text = match std::fs::read_to_string(facts_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", facts_path, e);
            return EXIT_STORAGE;
        }
    };
    let catalog = match SchemaFacts::from_json(&text)
        .map_err(|e| e.to_string())
        .and_then(|facts| facts.into_catalog().map_err(|e| e.to_string()))
    {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: invalid schema facts '{}': {}", facts_path, msg);
            return EXIT_CONFIG;
        }
    };

    let mut store = match open_store(db_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    match store.create_catalog(name, &catalog) {
        Ok(id) => {
            print_json(&json!({
                "catalog": id.0,
                "name": name,
                "procedures": catalog.procedures().len(),
                "statements": catalog.statements().len(),
            }));
            0
        }
        Err(e) => {
            eprintln!("Error: failed to register catalog: {}", e);
            EXIT_STORAGE
        }
    }
}

fn run_analyze(
    target: &Target,
    config_path: Option<&str>,
    ignore_proc: &[String],
    ignore_stmt: &[String],
    sequential: bool,
) -> i32 {
    let (mut store, id, catalog) = match open_target(target) {
        Ok(t) => t,
        Err(code) => return code,
    };

    let config = match config_path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => match AnalysisConfig::from_json(&text) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error: invalid config '{}': {}", path, e);
                    return EXIT_CONFIG;
                }
            },
            Err(e) => {
                eprintln!("Error: failed to read '{}': {}", path, e);
                return EXIT_STORAGE;
            }
        },
        None => AnalysisConfig::default(),
    };

    let builder = CalculatorBuilder::from_config(&catalog, &config)
        .and_then(|b| ignore_proc.iter().try_fold(b, |b, name| b.ignore_procedure(name)))
        .and_then(|b| ignore_stmt.iter().try_fold(b, |b, name| b.ignore_statement(name)));
    let builder = match builder {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: {}", e);
            return analysis_exit(&e);
        }
    };
    let builder = if sequential { builder.parallel(false) } else { builder };

    let report = match builder.build().run() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Analysis failed: {}", e);
            return analysis_exit(&e);
        }
    };

    if let Err(e) = store.replace_conflicts(id, &report) {
        eprintln!("Error: failed to publish conflict sets: {}", e);
        return EXIT_STORAGE;
    }

    let fingerprint = store.conflict_fingerprint(id).ok().flatten();
    print_json(&json!({
        "catalog": id.0,
        "analyzed": report.analyzed().len(),
        "sets": report.sets().len(),
        "conflicts": report.conflict_count(),
        "fingerprint": fingerprint,
    }));
    0
}

fn run_show(target: &Target, procedure: Option<&str>) -> i32 {
    let (store, id, catalog) = match open_target(target) {
        Ok(t) => t,
        Err(code) => return code,
    };
    let subject = match procedure.map(|name| lookup_procedure(&catalog, name)).transpose() {
        Ok(s) => s,
        Err(code) => return code,
    };

    let loaded = store
        .load_conflicts(id)
        .and_then(|report| Ok((report, store.conflict_fingerprint(id)?)));
    match loaded {
        Ok((report, fingerprint)) => {
            print_json(&render::report(&catalog, &report, fingerprint.as_deref(), subject));
            0
        }
        Err(e) => {
            eprintln!("Error: failed to load conflict sets: {}", e);
            EXIT_STORAGE
        }
    }
}

fn run_lookup(target: &Target, proc0: &str, proc1: &str) -> i32 {
    let (store, id, catalog) = match open_target(target) {
        Ok(t) => t,
        Err(code) => return code,
    };
    let (p0, p1) = match (lookup_procedure(&catalog, proc0), lookup_procedure(&catalog, proc1)) {
        (Ok(p0), Ok(p1)) => (p0, p1),
        (Err(code), _) | (_, Err(code)) => return code,
    };

    match store.load_conflicts(id) {
        Ok(report) => {
            print_json(&render::verdict(&catalog, p0, p1, &report.verdict(p0, p1)));
            0
        }
        Err(e) => {
            eprintln!("Error: failed to load conflict sets: {}", e);
            EXIT_STORAGE
        }
    }
}
