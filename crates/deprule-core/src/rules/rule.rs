//! Single dependency rules.

use crate::model::{Dependency, ItemType};
use crate::pattern::{ItemPattern, PatternError};
use std::fmt;
use std::sync::Arc;

/// Where a rule was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleRepresentation {
    /// Name of the rule file.
    pub source: String,
    /// Line number (1-indexed).
    pub line: usize,
    /// Rule text with abbreviations unexpanded.
    pub text: String,
    /// Whether the rule is a questionable rule.
    pub questionable: bool,
}

impl fmt::Display for RuleRepresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.text, self.source, self.line)
    }
}

/// A compiled rule: a using-item pattern and a used-item pattern that may
/// refer to the using pattern's captures.
#[derive(Debug)]
pub struct DependencyRule {
    using: ItemPattern,
    used: ItemPattern,
    representation: Arc<RuleRepresentation>,
    hit_count: u64,
}

impl DependencyRule {
    /// Compiles a rule.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern does not fit its type or refers to a
    /// capture group the using pattern does not have.
    pub fn new(
        using_type: Option<&ItemType>,
        using: &str,
        used_type: Option<&ItemType>,
        used: &str,
        representation: Arc<RuleRepresentation>,
        ignore_case: bool,
    ) -> Result<Self, PatternError> {
        let using = ItemPattern::compile(using_type, using, 0, ignore_case)?;
        let used = ItemPattern::compile(used_type, used, using.group_count(), ignore_case)?;
        Ok(Self {
            using,
            used,
            representation,
            hit_count: 0,
        })
    }

    /// Builds the rule `self.using ---> other.used`, as written at
    /// `representation`.
    ///
    /// # Errors
    ///
    /// Returns an error if `other`'s used pattern refers to more captures
    /// than `self`'s using pattern has.
    pub fn chain(
        &self,
        other: &DependencyRule,
        representation: Arc<RuleRepresentation>,
        ignore_case: bool,
    ) -> Result<Self, PatternError> {
        Self::new(
            self.using.item_type(),
            self.using.raw(),
            other.used.item_type(),
            other.used.raw(),
            representation,
            ignore_case,
        )
    }

    /// The using-item pattern.
    #[must_use]
    pub fn using(&self) -> &ItemPattern {
        &self.using
    }

    /// The used-item pattern.
    #[must_use]
    pub fn used(&self) -> &ItemPattern {
        &self.used
    }

    /// Where the rule was written.
    #[must_use]
    pub fn representation(&self) -> &RuleRepresentation {
        &self.representation
    }

    /// How often this rule matched.
    #[must_use]
    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    /// Identity used to drop duplicates when combining rule groups.
    pub(crate) fn key(&self) -> (&RuleRepresentation, &str, &str) {
        (&self.representation, self.using.raw(), self.used.raw())
    }

    /// Tests a dependency without counting the hit.
    #[must_use]
    pub fn matches(&self, dependency: &Dependency) -> bool {
        self.using
            .matches(dependency.using(), &[])
            .is_some_and(|captures| self.used.matches(dependency.used(), &captures).is_some())
    }

    /// Tests a dependency and counts the hit.
    pub fn is_match(&mut self, dependency: &Dependency) -> bool {
        let matched = self.matches(dependency);
        if matched {
            self.hit_count += 1;
        }
        matched
    }
}

impl fmt::Display for DependencyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.representation.fmt(f)
    }
}
