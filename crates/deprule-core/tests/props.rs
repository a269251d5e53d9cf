//! Property-based tests for interning, rule precedence and marking.

use deprule_core::marking::mark_transitive;
use deprule_core::{
    Checker, Classification, Dependency, DependencyFilter, MarkDependencies, MarkerEdit, Registry,
};
use proptest::prelude::*;
use std::collections::HashSet;

/// Dotted two-part names over a small alphabet, so that collisions are common.
fn arb_name() -> impl Strategy<Value = String> {
    "[a-d]\\.[a-d]".prop_map(|s| s.to_string())
}

fn arb_edges(max: usize) -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((arb_name(), arb_name()), 0..max)
}

fn build(registry: &mut Registry, edges: &[(String, String)]) -> Vec<Dependency> {
    let simple = registry.types().simple();
    edges
        .iter()
        .map(|(using, used)| {
            Dependency::new(
                registry.item(&simple, &[using.as_str()], false).unwrap(),
                registry.item(&simple, &[used.as_str()], false).unwrap(),
                1,
            )
        })
        .collect()
}

fn worst(registry: &mut Registry, rules: &str, adaptive: bool, deps: &mut [Dependency]) -> Vec<Classification> {
    let mut checker = Checker::builder()
        .rule_text("props.deprules", format!("$ SIMPLE ---> SIMPLE\n{rules}"))
        .adaptive_reordering(adaptive)
        .build(registry)
        .unwrap();
    let report = checker.check(deps);
    let mut worst = vec![Classification::Ok; deps.len()];
    for v in &report.violations {
        worst[v.index] = worst[v.index].max(v.classification);
    }
    worst
}

const LAYERED: &str = "\
a.* ---> b.*
b.* ---> c.*
** ---? d.*
a.a ---! **
c.* ---> **
";

proptest! {
    /// Interning the same values twice yields the same item, and the store
    /// holds one item per distinct value.
    #[test]
    fn prop_interning_is_idempotent(names in prop::collection::vec(arb_name(), 1..50)) {
        let mut registry = Registry::new();
        let simple = registry.types().simple();
        for name in &names {
            let first = registry.item(&simple, &[name.as_str()], false).unwrap();
            let second = registry.item(&simple, &[name.as_str()], false).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.as_string(), name.as_str());
        }
        let distinct: HashSet<&String> = names.iter().collect();
        prop_assert_eq!(registry.items().len(), distinct.len());
    }

    /// A forbidden rule wins over an allowed rule for the same dependency.
    #[test]
    fn prop_forbidden_wins(using in arb_name(), used in arb_name()) {
        let mut registry = Registry::new();
        let rules = format!("{using} ---> **\n** ---? {used}\n{using} ---! {used}\n");
        let mut deps = build(&mut registry, &[(using, used)]);
        prop_assert_eq!(worst(&mut registry, &rules, true, &mut deps), vec![Classification::Bad]);
        prop_assert_eq!(deps[0].bad_ct(), 1);
    }

    /// Dependencies no rule mentions are bad.
    #[test]
    fn prop_default_deny(edges in arb_edges(30)) {
        let mut registry = Registry::new();
        let mut deps = build(&mut registry, &edges);
        let classes = worst(&mut registry, "x.x ---> x.x\n", true, &mut deps);
        prop_assert!(classes.iter().all(|c| *c == Classification::Bad));
    }

    /// A rule set without rules denies everything.
    #[test]
    fn prop_empty_rule_set_denies_everything(edges in arb_edges(30)) {
        let mut registry = Registry::new();
        let mut deps = build(&mut registry, &edges);
        let classes = worst(&mut registry, "// only a comment\nX := a.**\n", true, &mut deps);
        prop_assert!(classes.iter().all(|c| *c == Classification::Bad));
        prop_assert!(deps.iter().all(|d| d.bad_ct() == d.ct()));
    }

    /// Reordering rules by hit count never changes a classification.
    #[test]
    fn prop_reordering_preserves_classification(edges in arb_edges(600)) {
        let mut registry = Registry::new();
        let deps = build(&mut registry, &edges);
        let mut reordered = deps.clone();
        let mut fixed = deps;
        let a = worst(&mut registry, LAYERED, true, &mut reordered);
        let b = worst(&mut registry, LAYERED, false, &mut fixed);
        prop_assert_eq!(a, b);
        for (r, f) in reordered.iter().zip(&fixed) {
            prop_assert_eq!((r.questionable_ct(), r.bad_ct()), (f.questionable_ct(), f.bad_ct()));
        }
    }

    /// Applying the same marker edit twice has the effect of applying it once.
    #[test]
    fn prop_marker_edit_is_idempotent(edges in arb_edges(30), pattern in arb_name()) {
        let mut registry = Registry::new();
        let deps = build(&mut registry, &edges);
        let filter = DependencyFilter::parse(
            [format!("{pattern} --->")],
            ["---> a.a"],
            registry.types(),
            false,
        )
        .unwrap();
        let edit = MarkDependencies::new()
            .dependency(MarkerEdit::new().add("seen").add("tmp").remove("tmp"));

        let mut once = deps.clone();
        edit.apply(&mut once, &filter);
        let mut twice = deps;
        edit.apply(&mut twice, &filter);
        edit.apply(&mut twice, &filter);

        for (a, b) in once.iter().zip(&twice) {
            prop_assert_eq!(a.markers(), b.markers());
            prop_assert!(!a.markers().contains("tmp"));
        }
    }

    /// Marking transitive edges again marks the same edges.
    #[test]
    fn prop_transitive_marking_is_stable(edges in arb_edges(40)) {
        let mut registry = Registry::new();
        let mut deps = build(&mut registry, &edges);
        let first = mark_transitive(&mut deps, &DependencyFilter::all(), "_transitive");
        let snapshot: Vec<String> = deps.iter().map(|d| d.markers().to_string()).collect();
        let second = mark_transitive(&mut deps, &DependencyFilter::all(), "_transitive");
        let again: Vec<String> = deps.iter().map(|d| d.markers().to_string()).collect();
        prop_assert_eq!(first, second);
        prop_assert_eq!(snapshot, again);
    }
}
