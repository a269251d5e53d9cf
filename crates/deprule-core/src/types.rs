//! Check outcomes, rule violations and reports.

use crate::model::{Dependency, SourceLocation};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Outcome of checking one dependency against a rule group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Allowed by a rule.
    Ok,
    /// Only matched by a questionable rule.
    Questionable,
    /// Forbidden, or matched by no rule.
    Bad,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Questionable => write!(f, "questionable"),
            Self::Bad => write!(f, "bad"),
        }
    }
}

/// Lowest classification that makes a check fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailOn {
    /// Fail on bad dependencies only.
    #[default]
    Bad,
    /// Fail on questionable or bad dependencies.
    Questionable,
}

impl FailOn {
    /// Lowest failing classification.
    #[must_use]
    pub fn threshold(self) -> Classification {
        match self {
            Self::Bad => Classification::Bad,
            Self::Questionable => Classification::Questionable,
        }
    }
}

/// A dependency that a rule group did not classify as ok.
#[derive(Debug, Clone, Serialize)]
pub struct RuleViolation {
    /// Index of the dependency in the checked slice.
    pub index: usize,
    /// Full string of the using item.
    pub using: String,
    /// Full string of the used item.
    pub used: String,
    /// The classification.
    pub classification: Classification,
    /// Source location of the dependency.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
    /// Selector of the rule group that produced the violation; empty for
    /// global rules.
    pub group: String,
}

impl RuleViolation {
    /// Creates a violation record for `dependency`.
    #[must_use]
    pub fn new(
        index: usize,
        dependency: &Dependency,
        classification: Classification,
        group: impl Into<String>,
    ) -> Self {
        Self {
            index,
            using: dependency.using().as_full_string(),
            used: dependency.used().as_full_string(),
            classification,
            source: dependency.source().cloned(),
            group: group.into(),
        }
    }
}

impl std::fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ---> {}", self.classification, self.using, self.used)?;
        if let Some(source) = &self.source {
            write!(f, " (at {source})")?;
        }
        Ok(())
    }
}

/// Result of checking a dependency set.
#[derive(Debug, Default, Serialize)]
pub struct CheckReport {
    /// Violations in check order, one per failing group check.
    pub violations: Vec<RuleViolation>,
    /// Number of dependencies checked.
    pub dependencies_checked: usize,
    /// Dependencies whose worst classification is ok.
    pub ok: usize,
    /// Dependencies whose worst classification is questionable.
    pub questionable: usize,
    /// Dependencies whose worst classification is bad.
    pub bad: usize,
}

impl CheckReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one dependency under its worst classification.
    pub fn count(&mut self, classification: Classification) {
        self.dependencies_checked += 1;
        match classification {
            Classification::Ok => self.ok += 1,
            Classification::Questionable => self.questionable += 1,
            Classification::Bad => self.bad += 1,
        }
    }

    /// Returns true if any dependency reaches the failure threshold.
    #[must_use]
    pub fn has_violations_at(&self, fail_on: FailOn) -> bool {
        match fail_on.threshold() {
            Classification::Ok => self.dependencies_checked > 0,
            Classification::Questionable => self.questionable + self.bad > 0,
            Classification::Bad => self.bad > 0,
        }
    }

    /// Adds the counts and violations of another report.
    pub fn extend(&mut self, other: Self) {
        self.violations.extend(other.violations);
        self.dependencies_checked += other.dependencies_checked;
        self.ok += other.ok;
        self.questionable += other.questionable;
        self.bad += other.bad;
    }

    /// One-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Checked {} dependencies: {} ok, {} questionable, {} bad",
            self.dependencies_checked, self.ok, self.questionable, self.bad
        )
    }
}

/// Renders violating dependencies, questionable-only ones first, then bad
/// ones, one [`Dependency::not_ok_message`] per line.
#[must_use]
pub fn format_violations(dependencies: &[Dependency]) -> String {
    let mut out = String::new();
    let questionable = dependencies
        .iter()
        .filter(|d| d.questionable_ct() > 0 && d.bad_ct() == 0);
    let bad = dependencies.iter().filter(|d| d.bad_ct() > 0);
    for d in questionable.chain(bad) {
        let _ = writeln!(out, "{}", d.not_ok_message());
    }
    out
}
