//! Dependency filters of the form `using -- markers -> used`.

use super::{ItemPattern, PatternError};
use crate::model::{Dependency, ItemTypeRegistry, MarkerPattern};
use std::fmt;

/// A filter over dependencies: an optional using-item pattern, a marker
/// predicate on the dependency and an optional used-item pattern, which may
/// refer to captures of the using pattern.
#[derive(Debug)]
pub struct DependencyMatch {
    raw: String,
    using: Option<ItemPattern>,
    markers: MarkerPattern,
    used: Option<ItemPattern>,
}

impl DependencyMatch {
    /// Parses `using -- markers -> used` or `using ---> used`. Each part may
    /// be empty; the item parts use the `[TYPE:]pattern['markers]` form.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidDependencyMatch`] without an arrow, or
    /// an item pattern error.
    pub fn parse(
        text: &str,
        types: &ItemTypeRegistry,
        ignore_case: bool,
    ) -> Result<Self, PatternError> {
        let (using, markers, used) = if let Some((using, used)) = text.split_once("--->") {
            (using, "", used)
        } else {
            let invalid = || PatternError::InvalidDependencyMatch(text.to_string());
            let (using, rest) = text.split_once("--").ok_or_else(invalid)?;
            let (markers, used) = rest.split_once("->").ok_or_else(invalid)?;
            (using, markers, used)
        };

        let using = non_empty(using)
            .map(|u| ItemPattern::parse_match(u, types, 0, ignore_case))
            .transpose()?;
        let available = using.as_ref().map_or(0, ItemPattern::group_count);
        let used = non_empty(used)
            .map(|u| ItemPattern::parse_match(u, types, available, ignore_case))
            .transpose()?;

        Ok(Self {
            raw: text.trim().to_string(),
            using,
            markers: MarkerPattern::parse(markers, ignore_case),
            used,
        })
    }

    /// The filter text.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Tests a dependency.
    #[must_use]
    pub fn is_match(&self, dependency: &Dependency) -> bool {
        if !self.markers.matches(dependency.markers()) {
            return false;
        }
        let captures = match &self.using {
            Some(using) => match using.matches(dependency.using(), &[]) {
                Some(captures) => captures,
                None => return false,
            },
            None => Vec::new(),
        };
        self.used
            .as_ref()
            .map_or(true, |used| used.matches(dependency.used(), &captures).is_some())
    }
}

impl fmt::Display for DependencyMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn non_empty(text: &str) -> Option<&str> {
    let text = text.trim();
    (!text.is_empty()).then_some(text)
}

/// A dependency passes if it matches any of `matches` (or `matches` is
/// empty) and none of `excludes`.
#[must_use]
pub fn matches_filters(
    dependency: &Dependency,
    matches: &[DependencyMatch],
    excludes: &[DependencyMatch],
) -> bool {
    (matches.is_empty() || matches.iter().any(|m| m.is_match(dependency)))
        && !excludes.iter().any(|m| m.is_match(dependency))
}
