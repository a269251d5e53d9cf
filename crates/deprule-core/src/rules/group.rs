//! Rule groups and dependency classification.

use super::DependencyRule;
use crate::model::Dependency;
use crate::pattern::ItemPattern;
use crate::types::{Classification, RuleViolation};
use std::collections::HashSet;
use tracing::debug;

/// Number of checked dependencies before the first rule reordering.
pub const INITIAL_REORDER_THRESHOLD: usize = 200;

/// The bucket a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Matching dependencies are ok.
    Allowed,
    /// Matching dependencies are questionable unless allowed.
    Questionable,
    /// Matching dependencies are bad.
    Forbidden,
}

/// Allowed, questionable and forbidden rules for all dependencies, or for
/// dependencies whose using item matches a selector.
///
/// Classification precedence is forbidden, then allowed, then questionable;
/// a dependency matching no rule is bad.
#[derive(Debug)]
pub struct DependencyRuleGroup {
    selector_text: String,
    selector: Option<ItemPattern>,
    allowed: Vec<DependencyRule>,
    questionable: Vec<DependencyRule>,
    forbidden: Vec<DependencyRule>,
    adaptive_reordering: bool,
}

impl DependencyRuleGroup {
    /// Creates an empty group that applies to every dependency.
    #[must_use]
    pub fn global() -> Self {
        Self {
            selector_text: String::new(),
            selector: None,
            allowed: Vec::new(),
            questionable: Vec::new(),
            forbidden: Vec::new(),
            adaptive_reordering: true,
        }
    }

    /// Creates an empty group for dependencies whose using item matches
    /// `selector`.
    #[must_use]
    pub fn with_selector(selector: ItemPattern) -> Self {
        Self {
            selector_text: selector.raw().to_string(),
            selector: Some(selector),
            ..Self::global()
        }
    }

    /// Selector text; empty for the global group.
    #[must_use]
    pub fn selector_text(&self) -> &str {
        &self.selector_text
    }

    /// Whether the group applies to every dependency.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.selector.is_none()
    }

    /// Enables or disables hit-count based rule reordering.
    #[must_use]
    pub fn adaptive_reordering(mut self, enabled: bool) -> Self {
        self.adaptive_reordering = enabled;
        self
    }

    /// Adds a rule to a bucket.
    pub fn add(&mut self, kind: RuleKind, rule: DependencyRule) {
        self.rules_mut(kind).push(rule);
    }

    /// Rules of one bucket, in current evaluation order.
    #[must_use]
    pub fn rules(&self, kind: RuleKind) -> &[DependencyRule] {
        match kind {
            RuleKind::Allowed => &self.allowed,
            RuleKind::Questionable => &self.questionable,
            RuleKind::Forbidden => &self.forbidden,
        }
    }

    fn rules_mut(&mut self, kind: RuleKind) -> &mut Vec<DependencyRule> {
        match kind {
            RuleKind::Allowed => &mut self.allowed,
            RuleKind::Questionable => &mut self.questionable,
            RuleKind::Forbidden => &mut self.forbidden,
        }
    }

    /// All rules: allowed, forbidden, then questionable.
    pub fn all_rules(&self) -> impl Iterator<Item = &DependencyRule> {
        self.allowed
            .iter()
            .chain(&self.forbidden)
            .chain(&self.questionable)
    }

    /// Returns `true` if the group has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty() && self.questionable.is_empty() && self.forbidden.is_empty()
    }

    /// Whether this group checks `dependency`.
    #[must_use]
    pub fn applies_to(&self, dependency: &Dependency) -> bool {
        self.selector
            .as_ref()
            .map_or(true, |s| s.is_match(dependency.using()))
    }

    /// Classifies one dependency, counting rule hits. Does not change the
    /// dependency.
    pub fn classify(&mut self, dependency: &Dependency) -> Classification {
        if self.forbidden.iter_mut().any(|r| r.is_match(dependency)) {
            Classification::Bad
        } else if self.allowed.iter_mut().any(|r| r.is_match(dependency)) {
            Classification::Ok
        } else if self.questionable.iter_mut().any(|r| r.is_match(dependency)) {
            Classification::Questionable
        } else {
            Classification::Bad
        }
    }

    /// Checks all dependencies this group applies to, in order. Non-ok
    /// results are appended to `violations` and recorded on the dependency.
    /// Returns `false` if any dependency is bad.
    pub fn check(
        &mut self,
        dependencies: &mut [Dependency],
        violations: &mut Vec<RuleViolation>,
    ) -> bool {
        let mut all_good = true;
        let mut checked = 0usize;
        let mut next_reorder = INITIAL_REORDER_THRESHOLD;

        for (index, dependency) in dependencies.iter_mut().enumerate() {
            if !self.applies_to(dependency) {
                continue;
            }
            let result = self.classify(dependency);
            if result != Classification::Ok {
                violations.push(RuleViolation::new(
                    index,
                    dependency,
                    result,
                    self.selector_text.clone(),
                ));
            }
            dependency.apply_check_result(result);
            all_good &= result != Classification::Bad;

            checked += 1;
            if self.adaptive_reordering && checked > next_reorder {
                self.reorder();
                next_reorder = 6 * next_reorder / 5 + INITIAL_REORDER_THRESHOLD;
            }
        }
        all_good
    }

    /// Sorts each bucket by descending hit count; ties keep their order.
    pub fn reorder(&mut self) {
        for rules in [&mut self.forbidden, &mut self.allowed, &mut self.questionable] {
            rules.sort_by(|a, b| b.hit_count().cmp(&a.hit_count()));
        }
        debug!(group = %self.selector_text, "Reordered rules by hit count");
    }

    /// Adds the rules of `other` that this group does not have yet.
    pub fn combine(&mut self, other: DependencyRuleGroup) {
        let DependencyRuleGroup {
            allowed,
            questionable,
            forbidden,
            ..
        } = other;
        for (kind, rules) in [
            (RuleKind::Allowed, allowed),
            (RuleKind::Questionable, questionable),
            (RuleKind::Forbidden, forbidden),
        ] {
            let known: HashSet<_> = self
                .rules(kind)
                .iter()
                .map(|r| {
                    let (rep, using, used) = r.key();
                    (rep.clone(), using.to_string(), used.to_string())
                })
                .collect();
            for rule in rules {
                let (rep, using, used) = rule.key();
                if !known.contains(&(rep.clone(), using.to_string(), used.to_string())) {
                    self.rules_mut(kind).push(rule);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Item, ItemType, Registry};
    use crate::rules::RuleRepresentation;
    use std::sync::Arc;

    fn rule(t: &ItemType, using: &str, used: &str) -> DependencyRule {
        let representation = Arc::new(RuleRepresentation {
            source: "test".to_string(),
            line: 1,
            text: format!("{using} ---> {used}"),
            questionable: false,
        });
        DependencyRule::new(Some(t), using, Some(t), used, representation, false).unwrap()
    }

    fn dep(registry: &mut Registry, using: &str, used: &str) -> Dependency {
        let t = registry.types().simple();
        let a: Item = registry.item(&t, &[using], false).unwrap();
        let b: Item = registry.item(&t, &[used], false).unwrap();
        Dependency::new(a, b, 1)
    }

    #[test]
    fn forbidden_wins_over_allowed() {
        let mut registry = Registry::new();
        let t = registry.types().simple();
        let mut group = DependencyRuleGroup::global();
        group.add(RuleKind::Allowed, rule(&t, "a", "b"));
        group.add(RuleKind::Forbidden, rule(&t, "a", "b"));
        assert_eq!(group.classify(&dep(&mut registry, "a", "b")), Classification::Bad);
    }

    #[test]
    fn allowed_wins_over_questionable() {
        let mut registry = Registry::new();
        let t = registry.types().simple();
        let mut group = DependencyRuleGroup::global();
        group.add(RuleKind::Questionable, rule(&t, "a", "*"));
        group.add(RuleKind::Allowed, rule(&t, "a", "b"));
        assert_eq!(group.classify(&dep(&mut registry, "a", "b")), Classification::Ok);
        assert_eq!(group.classify(&dep(&mut registry, "a", "c")), Classification::Questionable);
    }

    #[test]
    fn unmatched_dependency_is_bad() {
        let mut registry = Registry::new();
        let t = registry.types().simple();
        let mut group = DependencyRuleGroup::global();
        group.add(RuleKind::Allowed, rule(&t, "a", "b"));
        assert_eq!(group.classify(&dep(&mut registry, "x", "y")), Classification::Bad);
    }

    #[test]
    fn check_records_violations_and_counts() {
        let mut registry = Registry::new();
        let t = registry.types().simple();
        let mut group = DependencyRuleGroup::global();
        group.add(RuleKind::Allowed, rule(&t, "a", "b"));
        let mut deps = vec![dep(&mut registry, "a", "b"), dep(&mut registry, "a", "c")];
        let mut violations = Vec::new();

        assert!(!group.check(&mut deps, &mut violations));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].index, 1);
        assert_eq!(violations[0].classification, Classification::Bad);
        assert_eq!(deps[0].bad_ct(), 0);
        assert_eq!(deps[1].bad_ct(), 1);
        assert_eq!(deps[1].example_info(), Some("a ---! c"));
    }

    #[test]
    fn selector_limits_checked_dependencies() {
        let mut registry = Registry::new();
        let t = registry.types().simple();
        let selector = ItemPattern::compile(Some(&t), "x*", 0, false).unwrap();
        let mut group = DependencyRuleGroup::with_selector(selector);
        group.add(RuleKind::Allowed, rule(&t, "x1", "y"));
        let mut deps = vec![dep(&mut registry, "a", "b"), dep(&mut registry, "x2", "y")];
        let mut violations = Vec::new();
        group.check(&mut deps, &mut violations);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].index, 1);
        assert_eq!(violations[0].group, "x*");
    }

    #[test]
    fn reorder_puts_frequent_rules_first() {
        let mut registry = Registry::new();
        let t = registry.types().simple();
        let mut group = DependencyRuleGroup::global();
        group.add(RuleKind::Allowed, rule(&t, "rare", "*"));
        group.add(RuleKind::Allowed, rule(&t, "often", "*"));
        let mut deps: Vec<Dependency> = (0..250)
            .map(|i| dep(&mut registry, "often", &format!("u{i}")))
            .collect();
        assert!(group.check(&mut deps, &mut Vec::new()));
        assert_eq!(group.rules(RuleKind::Allowed)[0].using().raw(), "often");
    }

    #[test]
    fn disabled_reordering_keeps_order() {
        let mut registry = Registry::new();
        let t = registry.types().simple();
        let mut group = DependencyRuleGroup::global().adaptive_reordering(false);
        group.add(RuleKind::Allowed, rule(&t, "rare", "*"));
        group.add(RuleKind::Allowed, rule(&t, "often", "*"));
        let mut deps: Vec<Dependency> = (0..250)
            .map(|i| dep(&mut registry, "often", &format!("u{i}")))
            .collect();
        group.check(&mut deps, &mut Vec::new());
        assert_eq!(group.rules(RuleKind::Allowed)[0].using().raw(), "rare");
    }

    #[test]
    fn combine_is_a_union() {
        let t = Registry::new().types().simple();
        let mut first = DependencyRuleGroup::global();
        first.add(RuleKind::Allowed, rule(&t, "a", "b"));
        let mut second = DependencyRuleGroup::global();
        second.add(RuleKind::Allowed, rule(&t, "a", "b"));
        second.add(RuleKind::Forbidden, rule(&t, "c", "d"));
        first.combine(second);
        assert_eq!(first.rules(RuleKind::Allowed).len(), 1);
        assert_eq!(first.rules(RuleKind::Forbidden).len(), 1);
        assert_eq!(first.all_rules().count(), 2);
    }
}
