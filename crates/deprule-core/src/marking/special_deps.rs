//! Marking of self-cycles and transitive dependencies.

use super::DependencyFilter;
use crate::model::{collect_outgoing_of, Dependency, Item};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::info;

/// Adds `marker` to every selected dependency whose using and used item are
/// the same. Returns the number of such dependencies.
pub fn mark_self_cycles(
    dependencies: &mut [Dependency],
    filter: &DependencyFilter,
    marker: &str,
) -> usize {
    let mut marked = 0;
    for dependency in dependencies.iter_mut() {
        if dependency.is_self_loop() && filter.is_match(dependency) {
            dependency.markers_mut().add(marker);
            marked += 1;
        }
    }
    info!(marker, count = marked, "Marked self-cycles");
    marked
}

/// Adds `marker` to every selected dependency `r -> n` for which `n` is
/// also reachable from `r` along a longer path of selected dependencies.
/// Returns the number of such dependencies.
pub fn mark_transitive(
    dependencies: &mut [Dependency],
    filter: &DependencyFilter,
    marker: &str,
) -> usize {
    let to_mark = transitive_edges(dependencies, &filter.select(dependencies));
    for &i in &to_mark {
        dependencies[i].markers_mut().add(marker);
    }
    info!(marker, count = to_mark.len(), "Marked transitive dependencies");
    to_mark.len()
}

fn transitive_edges(dependencies: &[Dependency], selected: &[usize]) -> BTreeSet<usize> {
    let outgoing = collect_outgoing_of(dependencies, selected.iter().copied());
    let successors = |item: &Item| {
        outgoing[item]
            .iter()
            .map(|&e| dependencies[e].used())
            .collect::<Vec<_>>()
    };

    let mut to_mark = BTreeSet::new();
    for (root, edges) in &outgoing {
        // direct neighbors of root, with the edges reaching them
        let mut pending: HashMap<&Item, Vec<usize>> = HashMap::new();
        for &e in edges {
            pending.entry(dependencies[e].used()).or_default().push(e);
        }
        let distance_two: Vec<&Item> = pending.keys().flat_map(|&n| successors(n)).collect();

        for start in distance_two {
            if pending.is_empty() {
                break;
            }
            let mut visited: HashSet<&Item> = HashSet::from([root]);
            let mut stack = vec![start];
            while let Some(item) = stack.pop() {
                if pending.is_empty() {
                    break;
                }
                if !visited.insert(item) {
                    continue;
                }
                if let Some(reached) = pending.remove(item) {
                    to_mark.extend(reached);
                }
                stack.extend(successors(item).into_iter().rev());
            }
        }
    }
    to_mark
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marking::fixtures::chain_with_cycles;
    use crate::model::Registry;

    fn marked(deps: &[Dependency], marker: &str) -> Vec<String> {
        deps.iter()
            .filter(|d| d.markers().contains(marker))
            .map(|d| format!("{} -> {}", d.using().as_string(), d.used().as_string()))
            .collect()
    }

    fn simple_graph(registry: &mut Registry, edges: &[(&str, &str)]) -> Vec<Dependency> {
        let simple = registry.types().simple();
        edges
            .iter()
            .map(|(a, b)| {
                Dependency::new(
                    registry.item(&simple, &[*a], false).unwrap(),
                    registry.item(&simple, &[*b], false).unwrap(),
                    1,
                )
            })
            .collect()
    }

    #[test]
    fn only_the_self_loop_is_marked() {
        let mut registry = Registry::new();
        let (_, mut deps) = chain_with_cycles(&mut registry);
        assert_eq!(mark_self_cycles(&mut deps, &DependencyFilter::all(), "loop"), 1);
        assert_eq!(marked(&deps, "loop"), vec!["E -> E"]);
    }

    #[test]
    fn shortcut_is_marked_transitive() {
        let mut registry = Registry::new();
        let mut deps = simple_graph(&mut registry, &[("A", "B"), ("B", "C"), ("A", "C")]);
        assert_eq!(mark_transitive(&mut deps, &DependencyFilter::all(), "t"), 1);
        assert_eq!(marked(&deps, "t"), vec!["A -> C"]);
    }

    #[test]
    fn longer_paths_and_cycles_terminate() {
        let mut registry = Registry::new();
        let mut deps = simple_graph(
            &mut registry,
            &[("A", "B"), ("B", "C"), ("C", "B"), ("C", "D"), ("A", "D")],
        );
        mark_transitive(&mut deps, &DependencyFilter::all(), "t");
        // B is reached again from C, D through C
        assert_eq!(marked(&deps, "t"), vec!["A -> B", "A -> D"]);
    }

    #[test]
    fn self_loops_count_as_longer_paths() {
        let mut registry = Registry::new();
        let (_, mut deps) = chain_with_cycles(&mut registry);
        assert_eq!(mark_transitive(&mut deps, &DependencyFilter::all(), "t"), 2);
        assert_eq!(marked(&deps, "t"), vec!["D -> E", "E -> F"]);
    }

    #[test]
    fn filtered_out_edges_do_not_form_paths() {
        let mut registry = Registry::new();
        let mut deps = simple_graph(&mut registry, &[("A", "B"), ("B", "C"), ("A", "C")]);
        let filter = DependencyFilter::parse(["A --->"], ["---> B"], registry.types(), false).unwrap();
        assert_eq!(mark_transitive(&mut deps, &filter, "t"), 0);
    }

    #[test]
    fn marking_twice_is_idempotent() {
        let mut registry = Registry::new();
        let mut deps = simple_graph(&mut registry, &[("A", "B"), ("B", "C"), ("A", "C"), ("C", "C")]);
        for _ in 0..2 {
            mark_transitive(&mut deps, &DependencyFilter::all(), "t");
            mark_self_cycles(&mut deps, &DependencyFilter::all(), "t");
        }
        assert!(deps.iter().all(|d| d.markers().len() <= 1));
        assert_eq!(marked(&deps, "t"), vec!["A -> C", "B -> C", "C -> C"]);
    }
}
