//! Graph transformations that add or remove markers and reset counts.
//!
//! Every transformation works on the dependencies selected by a
//! [`DependencyFilter`]; the others are left untouched.

mod mark_deps;
mod special_deps;
mod special_items;

pub use mark_deps::{reset_counts, MarkDependencies, MarkerEdit};
pub use special_deps::{mark_self_cycles, mark_transitive};
pub use special_items::SpecialItemMarking;

use crate::model::{Dependency, ItemTypeRegistry};
use crate::pattern::{matches_filters, DependencyMatch, PatternError};

/// Selects dependencies matching any of a list of [`DependencyMatch`]es
/// (all, if the list is empty) and none of a list of excludes.
#[derive(Debug, Default)]
pub struct DependencyFilter {
    matches: Vec<DependencyMatch>,
    excludes: Vec<DependencyMatch>,
}

impl DependencyFilter {
    /// A filter selecting every dependency.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Parses match and exclude texts.
    ///
    /// # Errors
    ///
    /// Returns the first [`PatternError`] of any text.
    pub fn parse<M, E>(
        matches: M,
        excludes: E,
        types: &ItemTypeRegistry,
        ignore_case: bool,
    ) -> Result<Self, PatternError>
    where
        M: IntoIterator,
        M::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let parse_all = |texts: Vec<String>| {
            texts
                .iter()
                .map(|t| DependencyMatch::parse(t, types, ignore_case))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Self {
            matches: parse_all(matches.into_iter().map(|m| m.as_ref().to_string()).collect())?,
            excludes: parse_all(excludes.into_iter().map(|e| e.as_ref().to_string()).collect())?,
        })
    }

    /// Adds a match.
    #[must_use]
    pub fn matching(mut self, m: DependencyMatch) -> Self {
        self.matches.push(m);
        self
    }

    /// Adds an exclude.
    #[must_use]
    pub fn excluding(mut self, m: DependencyMatch) -> Self {
        self.excludes.push(m);
        self
    }

    /// Tests a dependency.
    #[must_use]
    pub fn is_match(&self, dependency: &Dependency) -> bool {
        matches_filters(dependency, &self.matches, &self.excludes)
    }

    /// Indices of the selected dependencies, in order.
    #[must_use]
    pub fn select(&self, dependencies: &[Dependency]) -> Vec<usize> {
        dependencies
            .iter()
            .enumerate()
            .filter(|(_, d)| self.is_match(d))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::model::{Dependency, Item, Registry};

    /// A→B→C, a C↔D cycle, D→E, a self-loop on E, then E→F→G→H→{I,J}.
    pub(crate) fn chain_with_cycles(registry: &mut Registry) -> (Vec<Item>, Vec<Dependency>) {
        let simple = registry.types().simple();
        let items: Vec<Item> = ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"]
            .iter()
            .map(|n| registry.item(&simple, &[*n], false).unwrap())
            .collect();
        let edge = |from: usize, to: usize, ct: u32, q: u32, b: u32| {
            Dependency::new(items[from].clone(), items[to].clone(), ct).with_counts(q, b)
        };
        let dependencies = vec![
            edge(0, 1, 10, 5, 3),
            edge(1, 2, 1, 0, 0),
            edge(2, 3, 5, 0, 2),
            edge(3, 2, 5, 0, 2),
            edge(3, 4, 5, 3, 2),
            edge(4, 4, 5, 3, 2),
            edge(4, 5, 5, 3, 2),
            edge(5, 6, 5, 3, 2),
            edge(6, 7, 5, 3, 2),
            edge(7, 8, 5, 3, 2),
            edge(7, 9, 5, 3, 2),
        ];
        (items, dependencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Registry;

    #[test]
    fn empty_filter_selects_all() {
        let mut registry = Registry::new();
        let (_, deps) = fixtures::chain_with_cycles(&mut registry);
        assert_eq!(DependencyFilter::all().select(&deps).len(), deps.len());
    }

    #[test]
    fn excludes_override_matches() {
        let mut registry = Registry::new();
        let (_, deps) = fixtures::chain_with_cycles(&mut registry);
        let filter = DependencyFilter::parse(["H --->", "A --->"], ["---> J"], registry.types(), false)
            .unwrap();
        assert_eq!(filter.select(&deps), vec![0, 9]);
    }

    #[test]
    fn invalid_match_is_an_error() {
        let registry = Registry::new();
        let empty: [&str; 0] = [];
        assert!(DependencyFilter::parse(["no arrow"], empty, registry.types(), false).is_err());
    }
}
