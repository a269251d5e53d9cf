//! Runs loaded rule sets over dependency sets.

use crate::config::{Config, ConfigError};
use crate::model::{Dependency, Registry};
use crate::rules::{DependencyRuleGroup, RuleSet, RuleSetError, RuleSetParser};
use crate::types::{CheckReport, Classification, FailOn};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info};

/// Errors that can occur while building a [`Checker`].
#[derive(Debug, Error)]
pub enum CheckerError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No rule file could be loaded.
    #[error("No usable rules: {failed} rule source(s) failed to load")]
    NoRules {
        /// Number of rule sources that failed.
        failed: usize,
    },
}

enum RuleSource {
    File(PathBuf),
    Text { name: String, text: String },
}

/// Builder for configuring a [`Checker`].
#[derive(Default)]
pub struct CheckerBuilder {
    sources: Vec<RuleSource>,
    config: Option<Config>,
    ignore_case: Option<bool>,
    adaptive_reordering: Option<bool>,
    fail_on: Option<FailOn>,
}

impl CheckerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule file.
    #[must_use]
    pub fn rule_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(RuleSource::File(path.into()));
        self
    }

    /// Adds several rule files.
    #[must_use]
    pub fn rule_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources
            .extend(paths.into_iter().map(|p| RuleSource::File(p.into())));
        self
    }

    /// Adds rules given as text; `name` appears in error messages.
    #[must_use]
    pub fn rule_text(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.sources.push(RuleSource::Text {
            name: name.into(),
            text: text.into(),
        });
        self
    }

    /// Sets the configuration. Its rule files are loaded after the
    /// explicitly added sources.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides case-insensitive matching.
    #[must_use]
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = Some(ignore_case);
        self
    }

    /// Overrides rule reordering.
    #[must_use]
    pub fn adaptive_reordering(mut self, enabled: bool) -> Self {
        self.adaptive_reordering = Some(enabled);
        self
    }

    /// Overrides the failure threshold.
    #[must_use]
    pub fn fail_on(mut self, fail_on: FailOn) -> Self {
        self.fail_on = Some(fail_on);
        self
    }

    /// Parses all rule sources, declaring their item types in `registry`.
    ///
    /// A rule source that fails to load is logged and skipped; its error is
    /// kept in [`Checker::rule_errors`].
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid configuration, or if sources were
    /// given and none of them loaded.
    pub fn build(self, registry: &mut Registry) -> Result<Checker, CheckerError> {
        let config = self.config.unwrap_or_default();
        let ignore_case = self.ignore_case.unwrap_or(config.ignore_case);
        let adaptive_reordering = self
            .adaptive_reordering
            .unwrap_or(config.adaptive_reordering);
        let fail_on = self.fail_on.unwrap_or(config.fail_on);

        let mut sources = self.sources;
        sources.extend(config.rule_paths()?.into_iter().map(RuleSource::File));

        let mut rule_sets: Vec<RuleSet> = Vec::new();
        let mut rule_errors: Vec<RuleSetError> = Vec::new();
        for source in &sources {
            let mut parser = RuleSetParser::new(registry.types_mut())
                .ignore_case(ignore_case)
                .adaptive_reordering(adaptive_reordering);
            let parsed = match source {
                RuleSource::File(path) => parser.parse_file(path),
                RuleSource::Text { name, text } => parser.parse_str(name, text),
            };
            match parsed {
                Ok(rule_set) => {
                    debug!(
                        source = rule_set.source(),
                        rules = rule_set.rule_count(),
                        "Loaded rule set"
                    );
                    rule_sets.push(rule_set);
                }
                Err(e) => {
                    error!("Excluding rule set: {e}");
                    rule_errors.push(e);
                }
            }
        }

        if rule_sets.is_empty() && !rule_errors.is_empty() {
            return Err(CheckerError::NoRules {
                failed: rule_errors.len(),
            });
        }

        Ok(Checker {
            groups: combine_groups(rule_sets, adaptive_reordering),
            rule_errors,
            fail_on,
        })
    }
}

/// Merges the groups of all rule sets: one global group, then one group per
/// distinct selector in order of first appearance. The global group is kept
/// even without rules, so that unmatched dependencies stay bad.
fn combine_groups(rule_sets: Vec<RuleSet>, adaptive_reordering: bool) -> Vec<DependencyRuleGroup> {
    let mut groups =
        vec![DependencyRuleGroup::global().adaptive_reordering(adaptive_reordering)];
    for group in rule_sets.into_iter().flat_map(RuleSet::into_groups) {
        match groups
            .iter_mut()
            .find(|g| g.selector_text() == group.selector_text())
        {
            Some(existing) => existing.combine(group),
            None => groups.push(group),
        }
    }
    groups.retain(|g| g.is_global() || !g.is_empty());
    groups
}

/// Checks dependencies against loaded rule groups.
///
/// Use [`Checker::builder()`] to construct an instance.
pub struct Checker {
    groups: Vec<DependencyRuleGroup>,
    rule_errors: Vec<RuleSetError>,
    fail_on: FailOn,
}

impl Checker {
    /// Creates a new builder for configuring a checker.
    #[must_use]
    pub fn builder() -> CheckerBuilder {
        CheckerBuilder::new()
    }

    /// Rule groups, global group first.
    #[must_use]
    pub fn groups(&self) -> &[DependencyRuleGroup] {
        &self.groups
    }

    /// Total number of rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|g| g.all_rules().count()).sum()
    }

    /// Errors of rule sources that were skipped.
    #[must_use]
    pub fn rule_errors(&self) -> &[RuleSetError] {
        &self.rule_errors
    }

    /// The failure threshold.
    #[must_use]
    pub fn fail_on(&self) -> FailOn {
        self.fail_on
    }

    /// Classifies every dependency with every group that applies to it, in
    /// the given order. Non-ok results are recorded on the dependencies.
    pub fn check(&mut self, dependencies: &mut [Dependency]) -> CheckReport {
        let mut violations = Vec::new();
        for group in &mut self.groups {
            group.check(dependencies, &mut violations);
        }

        let mut worst = vec![Classification::Ok; dependencies.len()];
        for v in &violations {
            worst[v.index] = worst[v.index].max(v.classification);
        }

        let mut report = CheckReport::new();
        for classification in worst {
            report.count(classification);
        }
        report.violations = violations;

        info!("{}", report.summary());
        report
    }

    /// Returns `true` if the report reaches the failure threshold.
    #[must_use]
    pub fn fails(&self, report: &CheckReport) -> bool {
        report.has_violations_at(self.fail_on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Item;

    const SIMPLE_RULES: &str = "$ SIMPLE ---> SIMPLE\n";

    fn dep(registry: &mut Registry, using: &str, used: &str) -> Dependency {
        let t = registry.types().simple();
        let a: Item = registry.item(&t, &[using], false).unwrap();
        let b: Item = registry.item(&t, &[used], false).unwrap();
        Dependency::new(a, b, 1)
    }

    #[test]
    fn test_check_counts_worst_classification() {
        let mut registry = Registry::new();
        let mut checker = Checker::builder()
            .rule_text("global", format!("{SIMPLE_RULES}a.** ---> b.**\na.** ---? c.**\n"))
            .rule_text("aspect", format!("{SIMPLE_RULES}a.x {{\n ---> c.**\n}}\n"))
            .build(&mut registry)
            .unwrap();
        let mut deps = vec![
            dep(&mut registry, "a.x", "b.y"),
            dep(&mut registry, "a.x", "c.y"),
            dep(&mut registry, "a.x", "b.z"),
            dep(&mut registry, "a.y", "d"),
        ];
        let report = checker.check(&mut deps);

        assert_eq!(report.dependencies_checked, 4);
        // a.x -> b.* fails the aspect group
        assert_eq!((report.ok, report.questionable, report.bad), (0, 1, 3));
        assert!(checker.fails(&report));
        assert_eq!(deps[1].questionable_ct(), 1);
    }

    #[test]
    fn test_groups_with_equal_selector_are_combined() {
        let mut registry = Registry::new();
        let checker = Checker::builder()
            .rule_text("one", format!("{SIMPLE_RULES}** ---> a\nx.** {{\n ---> y\n}}\n"))
            .rule_text("two", format!("{SIMPLE_RULES}** ---> b\nx.** {{\n ---> z\n}}\n"))
            .build(&mut registry)
            .unwrap();
        assert_eq!(checker.groups().len(), 2);
        assert_eq!(checker.groups()[1].selector_text(), "x.**");
        assert_eq!(checker.rule_count(), 4);
    }

    #[test]
    fn test_broken_rule_set_is_skipped() {
        let mut registry = Registry::new();
        let mut checker = Checker::builder()
            .rule_text("good", format!("{SIMPLE_RULES}** ---> **\n"))
            .rule_text("broken", format!("{SIMPLE_RULES}a ---> b\nnonsense\n"))
            .build(&mut registry)
            .unwrap();
        assert_eq!(checker.rule_errors().len(), 1);
        assert_eq!(checker.rule_errors()[0].line(), Some(3));
        let mut deps = vec![dep(&mut registry, "x", "y")];
        assert_eq!(checker.check(&mut deps).ok, 1);
    }

    #[test]
    fn test_rule_set_without_rules_denies_everything() {
        let mut registry = Registry::new();
        let mut checker = Checker::builder()
            .rule_text("empty", "// only a comment\nX := a.**\n")
            .build(&mut registry)
            .unwrap();
        assert_eq!(checker.rule_count(), 0);
        assert_eq!(checker.groups().len(), 1);
        let mut deps = vec![dep(&mut registry, "a", "b"), dep(&mut registry, "a", "a")];
        let report = checker.check(&mut deps);
        assert_eq!((report.ok, report.bad), (0, 2));
        assert_eq!(report.violations.len(), 2);
    }

    #[test]
    fn test_no_rule_sources_denies_everything() {
        let mut registry = Registry::new();
        let mut checker = Checker::builder().build(&mut registry).unwrap();
        let mut deps = vec![dep(&mut registry, "a", "b")];
        assert_eq!(checker.check(&mut deps).bad, 1);
    }

    #[test]
    fn test_aspect_only_rule_set_keeps_global_default_deny() {
        let mut registry = Registry::new();
        let mut checker = Checker::builder()
            .rule_text("aspect", format!("{SIMPLE_RULES}a.** {{\n ---> b\n}}\n"))
            .build(&mut registry)
            .unwrap();
        assert_eq!(checker.groups().len(), 2);
        let mut deps = vec![dep(&mut registry, "a.x", "b")];
        // allowed by the aspect group, but no global rule matches
        assert_eq!(checker.check(&mut deps).bad, 1);
    }

    #[test]
    fn test_all_rule_sets_broken() {
        let mut registry = Registry::new();
        let result = Checker::builder()
            .rule_file("/nonexistent/rules.deprules")
            .build(&mut registry);
        assert!(matches!(result, Err(CheckerError::NoRules { failed: 1 })));
    }

    #[test]
    fn test_fail_on_questionable() {
        let mut registry = Registry::new();
        let mut checker = Checker::builder()
            .rule_text("r", format!("{SIMPLE_RULES}a ---? b\n"))
            .fail_on(FailOn::Questionable)
            .build(&mut registry)
            .unwrap();
        let mut deps = vec![dep(&mut registry, "a", "b")];
        let report = checker.check(&mut deps);
        assert_eq!(report.questionable, 1);
        assert!(checker.fails(&report));
    }

    #[test]
    fn test_config_supplies_rule_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.deprules"), format!("{SIMPLE_RULES}a ---> b\n")).unwrap();
        let config = Config::parse("rule_files = [\"*.deprules\"]")
            .unwrap()
            .with_base_dir(dir.path());

        let mut registry = Registry::new();
        let checker = Checker::builder().config(config).build(&mut registry).unwrap();
        assert_eq!(checker.rule_count(), 1);
        assert_eq!(checker.fail_on(), FailOn::Bad);
    }
}
