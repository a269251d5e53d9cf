//! Marker editing and count resetting on selected dependencies.

use super::DependencyFilter;
use crate::model::{Dependency, Item, MarkerSet};
use std::collections::HashSet;
use tracing::info;

/// Markers to add and remove, or a request to clear all markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerEdit {
    add: Vec<String>,
    remove: Vec<String>,
    clear: bool,
}

impl MarkerEdit {
    /// An edit that changes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a marker; a leading `'` is ignored.
    #[must_use]
    pub fn add(mut self, marker: &str) -> Self {
        self.add.push(marker.trim_start_matches('\'').to_string());
        self
    }

    /// Removes a marker; a leading `'` is ignored.
    #[must_use]
    pub fn remove(mut self, marker: &str) -> Self {
        self.remove.push(marker.trim_start_matches('\'').to_string());
        self
    }

    /// Removes all markers instead of adding and removing.
    #[must_use]
    pub fn clear(mut self) -> Self {
        self.clear = true;
        self
    }

    /// Returns `true` if applying the edit changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.clear && self.add.is_empty() && self.remove.is_empty()
    }

    fn apply_to_set(&self, markers: &mut MarkerSet) {
        if self.clear {
            markers.clear();
            return;
        }
        markers.extend(&self.add);
        for m in &self.remove {
            markers.remove(m);
        }
    }

    fn apply_to_item(&self, item: &Item) {
        if self.clear {
            item.clear_markers();
            return;
        }
        for m in &self.add {
            item.add_marker(m);
        }
        for m in &self.remove {
            item.remove_marker(m);
        }
    }
}

/// Edits the markers of selected dependencies and of their using ("left")
/// and used ("right") items.
#[derive(Debug, Clone, Default)]
pub struct MarkDependencies {
    left: MarkerEdit,
    dependency: MarkerEdit,
    right: MarkerEdit,
}

impl MarkDependencies {
    /// Creates a transformation that changes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Edit for using items.
    #[must_use]
    pub fn left(mut self, edit: MarkerEdit) -> Self {
        self.left = edit;
        self
    }

    /// Edit for the dependencies.
    #[must_use]
    pub fn dependency(mut self, edit: MarkerEdit) -> Self {
        self.dependency = edit;
        self
    }

    /// Edit for used items.
    #[must_use]
    pub fn right(mut self, edit: MarkerEdit) -> Self {
        self.right = edit;
        self
    }

    /// Applies the edits. Items are changed after all dependencies were
    /// selected, so item edits do not influence which dependencies match.
    /// Returns the number of selected dependencies.
    pub fn apply(&self, dependencies: &mut [Dependency], filter: &DependencyFilter) -> usize {
        let selected = filter.select(dependencies);
        let mut left: Vec<Item> = Vec::new();
        let mut right: Vec<Item> = Vec::new();

        for &i in &selected {
            let dependency = &mut dependencies[i];
            left.push(dependency.using().clone());
            right.push(dependency.used().clone());
            self.dependency.apply_to_set(dependency.markers_mut());
        }
        info!(count = selected.len(), "Marked dependencies");

        for (items, edit) in [(left, &self.left), (right, &self.right)] {
            if edit.is_empty() {
                continue;
            }
            let mut seen = HashSet::new();
            for item in items {
                if seen.insert(item.clone()) {
                    edit.apply_to_item(&item);
                }
            }
        }
        selected.len()
    }
}

/// Sets the questionable and/or bad count of every selected dependency to
/// zero. Returns the number of selected dependencies.
pub fn reset_counts(
    dependencies: &mut [Dependency],
    filter: &DependencyFilter,
    questionable: bool,
    bad: bool,
) -> usize {
    let mut count = 0;
    for dependency in dependencies.iter_mut().filter(|d| filter.is_match(d)) {
        if questionable {
            dependency.reset_questionable();
        }
        if bad {
            dependency.reset_bad();
        }
        count += 1;
    }
    info!(count, questionable, bad, "Reset dependency counts");
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Registry;

    fn setup(registry: &mut Registry) -> (Item, Item, Item, Vec<Dependency>) {
        let simple = registry.types().simple();
        let a = registry.item(&simple, &["A"], false).unwrap();
        let b = registry.item(&simple, &["B"], false).unwrap();
        let c = registry.item(&simple, &["C"], false).unwrap();
        let deps = vec![
            Dependency::new(a.clone(), a.clone(), 10).with_counts(5, 3),
            Dependency::new(a.clone(), b.clone(), 1).with_marker_text("use+define"),
            Dependency::new(a.clone(), c.clone(), 5).with_marker_text("define").with_counts(0, 2),
            Dependency::new(b.clone(), a.clone(), 5).with_marker_text("define").with_counts(0, 2),
        ];
        (a, b, c, deps)
    }

    #[test]
    fn dependency_markers_are_added_and_removed() {
        let mut registry = Registry::new();
        let (.., mut deps) = setup(&mut registry);
        let filter = DependencyFilter::parse(["-- define ->"], Vec::<String>::new(), registry.types(), false).unwrap();
        let n = MarkDependencies::new()
            .dependency(MarkerEdit::new().add("checked").remove("'define"))
            .apply(&mut deps, &filter);
        assert_eq!(n, 3);
        assert!(deps[0].markers().is_empty());
        assert_eq!(deps[1].markers().to_string(), "checked+use");
        assert_eq!(deps[2].markers().to_string(), "checked");
    }

    #[test]
    fn clear_removes_all_dependency_markers() {
        let mut registry = Registry::new();
        let (.., mut deps) = setup(&mut registry);
        MarkDependencies::new()
            .dependency(MarkerEdit::new().clear())
            .apply(&mut deps, &DependencyFilter::all());
        assert!(deps.iter().all(|d| d.markers().is_empty()));
    }

    #[test]
    fn items_are_marked_after_selection() {
        let mut registry = Registry::new();
        let (a, b, c, mut deps) = setup(&mut registry);
        // selects dependencies whose using item is not yet marked "left"
        let filter = DependencyFilter::parse(["'~left --->"], Vec::<String>::new(), registry.types(), false).unwrap();
        let n = MarkDependencies::new()
            .left(MarkerEdit::new().add("left"))
            .right(MarkerEdit::new().add("right"))
            .apply(&mut deps, &filter);
        assert_eq!(n, 4);
        assert!(a.has_marker("left") && a.has_marker("right"));
        assert!(b.has_marker("left") && b.has_marker("right"));
        assert!(!c.has_marker("left") && c.has_marker("right"));
    }

    #[test]
    fn counts_are_reset_on_selected_dependencies() {
        let mut registry = Registry::new();
        let (.., mut deps) = setup(&mut registry);
        let filter = DependencyFilter::parse(["A --->"], Vec::<String>::new(), registry.types(), false).unwrap();
        assert_eq!(reset_counts(&mut deps, &filter, false, true), 3);
        assert_eq!(deps[0].bad_ct(), 0);
        assert_eq!(deps[0].questionable_ct(), 5);
        assert_eq!(deps[3].bad_ct(), 2);
        reset_counts(&mut deps, &DependencyFilter::all(), true, false);
        assert!(deps.iter().all(|d| d.questionable_ct() == 0));
    }
}
