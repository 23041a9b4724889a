//! Property tests over randomly generated schemas.

use std::collections::BTreeSet;

use proptest::prelude::*;

use procset_check::CalculatorBuilder;
use procset_core::{
    Catalog, ConflictReport, PlanShape, ProcedureFacts, QueryKind, SchemaFacts, StatementDef,
    StatementFacts, TableFacts,
};

const TABLES: [&str; 3] = ["t0", "t1", "t2"];
const COLUMNS: [&str; 3] = ["c0", "c1", "c2"];

/// Raw random choices for one statement, mapped onto the fixed schema.
#[derive(Debug, Clone)]
struct StmtSeed {
    kind: u8,
    table_mask: u8,
    referenced_mask: u16,
    modified_mask: u8,
    output_mask: u8,
    aggregate: bool,
    range: bool,
}

fn stmt_seed() -> impl Strategy<Value = StmtSeed> {
    (
        0u8..4,
        1u8..8,
        0u16..512,
        1u8..8,
        0u8..8,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(
            |(kind, table_mask, referenced_mask, modified_mask, output_mask, aggregate, range)| {
                StmtSeed {
                    kind,
                    table_mask,
                    referenced_mask,
                    modified_mask,
                    output_mask,
                    aggregate,
                    range,
                }
            },
        )
}

fn bits(mask: u16, width: usize) -> impl Iterator<Item = usize> {
    (0..width).filter(move |i| mask & (1 << i) != 0)
}

fn statement(name: &str, seed: &StmtSeed) -> StatementFacts {
    let kind = match seed.kind {
        0 => QueryKind::Select,
        1 => QueryKind::Insert,
        2 => QueryKind::Update,
        _ => QueryKind::Delete,
    };
    let mut tables: Vec<usize> = bits(seed.table_mask as u16, 3).collect();
    if matches!(kind, QueryKind::Update | QueryKind::Delete) {
        tables.truncate(1);
    }
    let qualified = |t: usize, c: usize| format!("{}.{}", TABLES[t], COLUMNS[c]);

    let referenced: Vec<String> = bits(seed.referenced_mask, 9)
        .filter(|i| tables.contains(&(i / 3)))
        .map(|i| qualified(i / 3, i % 3))
        .collect();
    let mut plan = StatementFacts::new(name, kind);
    let p = plan.plan.as_mut().unwrap();
    p.tables = tables.iter().map(|&t| TABLES[t].to_string()).collect();
    p.referenced_columns = referenced;
    match kind {
        QueryKind::Select => {
            p.output_columns = tables
                .iter()
                .flat_map(|&t| bits(seed.output_mask as u16, 3).map(move |c| (t, c)))
                .map(|(t, c)| qualified(t, c))
                .collect();
            p.aggregate = seed.aggregate;
            p.range_predicate = seed.range;
        }
        QueryKind::Update => {
            p.modified_columns = bits(seed.modified_mask as u16, 3)
                .map(|c| qualified(tables[0], c))
                .collect();
        }
        QueryKind::Insert | QueryKind::Delete => {}
    }
    plan
}

fn schema() -> impl Strategy<Value = Catalog> {
    prop::collection::vec(prop::collection::vec(stmt_seed(), 1..4), 1..5).prop_map(|procs| {
        let tables = vec![
            TableFacts::new("t0", &COLUMNS, &["c0"]),
            TableFacts::new("t1", &COLUMNS, &["c0"]),
            TableFacts::new("t2", &COLUMNS, &["c0", "c1"]),
        ];
        let procedures = procs
            .iter()
            .enumerate()
            .map(|(p, seeds)| {
                let mut facts = ProcedureFacts::new(&format!("P{}", p));
                for (s, seed) in seeds.iter().enumerate() {
                    facts = facts.statement(statement(&format!("s{}", s), seed));
                }
                facts
            })
            .collect();
        SchemaFacts { tables, procedures }
            .into_catalog()
            .expect("generated schema is valid")
    })
}

fn plan(stmt: &StatementDef) -> &PlanShape {
    stmt.plan.as_ref().expect("generated statements are planned")
}

fn run(catalog: &Catalog) -> ConflictReport {
    CalculatorBuilder::new(catalog).build().run().expect("analysis succeeds")
}

fn recorded(
    report: &ConflictReport,
    rw: bool,
    s0: &StatementDef,
    s1: &StatementDef,
) -> Option<bool> {
    let set = if rw {
        report.read_write(s0.procedure, s1.procedure)
    } else {
        report.write_write(s0.procedure, s1.procedure)
    }?;
    set.conflicts
        .iter()
        .find(|c| c.stmt0 == s0.id && c.stmt1 == s1.id)
        .map(|c| c.always_conflicting)
}

proptest! {
    #[test]
    fn read_write_iff_rule(catalog in schema()) {
        let report = run(&catalog);
        for r in catalog.statements().iter().filter(|s| s.kind == QueryKind::Select) {
            for w in catalog.statements().iter().filter(|s| s.kind.is_write()) {
                let (pr, pw) = (plan(r), plan(w));
                let tables_overlap = !pr.tables.is_disjoint(&pw.tables);
                let observed: BTreeSet<_> =
                    pr.referenced_columns.union(&pr.output_columns).copied().collect();
                let expected = tables_overlap
                    && (w.kind != QueryKind::Update || !observed.is_disjoint(&pw.modified_columns));
                let got = recorded(&report, true, r, w);
                prop_assert_eq!(got.is_some(), expected, "{} vs {}", r.name, w.name);
                if let Some(always) = got {
                    prop_assert!(!always);
                }
            }
        }
    }

    #[test]
    fn double_insert_always_conflicts(catalog in schema()) {
        let report = run(&catalog);
        let inserts: Vec<_> = catalog
            .statements()
            .iter()
            .filter(|s| s.kind == QueryKind::Insert)
            .collect();
        for a in &inserts {
            for b in &inserts {
                if !plan(a).tables.is_disjoint(&plan(b).tables) {
                    prop_assert_eq!(recorded(&report, false, a, b), Some(true));
                }
            }
        }
    }

    #[test]
    fn unbounded_delete_always_conflicts(catalog in schema()) {
        let report = run(&catalog);
        for d in catalog.statements().iter().filter(|s| s.kind == QueryKind::Delete) {
            let pd = plan(d);
            let table = catalog.table(pd.sole_table().unwrap()).unwrap();
            if table.primary_key.is_subset(&pd.referenced_columns) {
                continue;
            }
            for w in catalog.statements().iter().filter(|s| s.kind.is_write()) {
                if !plan(w).tables.is_disjoint(&pd.tables) {
                    prop_assert_eq!(recorded(&report, false, d, w), Some(true));
                    prop_assert_eq!(recorded(&report, false, w, d), Some(true));
                }
            }
        }
    }

    #[test]
    fn runs_are_idempotent_and_order_independent(catalog in schema()) {
        let first = serde_json::to_vec(&run(&catalog)).unwrap();
        let second = serde_json::to_vec(&run(&catalog)).unwrap();
        prop_assert_eq!(&first, &second);

        let sequential = CalculatorBuilder::new(&catalog).parallel(false).build().run().unwrap();
        prop_assert_eq!(first, serde_json::to_vec(&sequential).unwrap());
    }

    #[test]
    fn conflicts_always_share_a_table(catalog in schema()) {
        let report = run(&catalog);
        for set in report.sets() {
            prop_assert!(!set.conflicts.is_empty());
            for conflict in &set.conflicts {
                prop_assert!(!conflict.tables().is_empty());
            }
        }
    }
}
