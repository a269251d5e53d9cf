//! Marking of source and sink items.

use super::DependencyFilter;
use crate::model::{Dependency, Item};
use std::collections::{HashMap, HashSet};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Sources,
    Sinks,
}

/// Marks items without incoming ("sources") or outgoing ("sinks") selected
/// dependencies.
///
/// With `recursive`, an item is also marked when all its predecessors
/// (for sources) or successors (for sinks) are marked. With
/// `ignore_self_cycles`, dependencies from an item to itself are not counted.
#[derive(Debug, Clone)]
pub struct SpecialItemMarking {
    marker: String,
    recursive: bool,
    ignore_self_cycles: bool,
}

impl SpecialItemMarking {
    /// Marks with `marker`, non-recursively and counting self-cycles.
    #[must_use]
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            recursive: false,
            ignore_self_cycles: false,
        }
    }

    /// Propagates marks to items whose neighbors are all marked.
    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Ignores dependencies from an item to itself.
    #[must_use]
    pub fn ignore_self_cycles(mut self, ignore: bool) -> Self {
        self.ignore_self_cycles = ignore;
        self
    }

    /// Marks source items. Returns them in order of first appearance.
    pub fn mark_sources(&self, dependencies: &[Dependency], filter: &DependencyFilter) -> Vec<Item> {
        self.mark(dependencies, filter, Direction::Sources)
    }

    /// Marks sink items. Returns them in order of first appearance.
    pub fn mark_sinks(&self, dependencies: &[Dependency], filter: &DependencyFilter) -> Vec<Item> {
        self.mark(dependencies, filter, Direction::Sinks)
    }

    fn mark(
        &self,
        dependencies: &[Dependency],
        filter: &DependencyFilter,
        direction: Direction,
    ) -> Vec<Item> {
        let mut order: Vec<&Item> = Vec::new();
        // neighbors that must be marked first, and the reverse relation
        let mut blockers: HashMap<&Item, HashSet<&Item>> = HashMap::new();
        let mut blocked: HashMap<&Item, Vec<&Item>> = HashMap::new();

        for dependency in dependencies.iter().filter(|d| filter.is_match(d)) {
            for item in [dependency.using(), dependency.used()] {
                if !blockers.contains_key(item) {
                    blockers.insert(item, HashSet::new());
                    order.push(item);
                }
            }
            if self.ignore_self_cycles && dependency.is_self_loop() {
                continue;
            }
            let (item, neighbor) = match direction {
                Direction::Sinks => (dependency.using(), dependency.used()),
                Direction::Sources => (dependency.used(), dependency.using()),
            };
            if blockers.entry(item).or_default().insert(neighbor) {
                blocked.entry(neighbor).or_default().push(item);
            }
        }

        let mut remaining: HashMap<&Item, usize> =
            blockers.iter().map(|(item, b)| (*item, b.len())).collect();
        let mut queue: Vec<&Item> = order
            .iter()
            .copied()
            .filter(|item| remaining.get(item) == Some(&0))
            .collect();
        let mut marked: HashSet<&Item> = HashSet::new();

        while let Some(item) = queue.pop() {
            if !marked.insert(item) || !self.recursive {
                continue;
            }
            for &waiting in blocked.get(item).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(waiting) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push(waiting);
                    }
                }
            }
        }

        let result: Vec<Item> = order
            .into_iter()
            .filter(|item| marked.contains(item))
            .cloned()
            .collect();
        for item in &result {
            item.add_marker(&self.marker);
        }
        info!(
            marker = %self.marker,
            count = result.len(),
            kind = ?direction,
            recursive = self.recursive,
            "Marked items"
        );
        result
    }
}
