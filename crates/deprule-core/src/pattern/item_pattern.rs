//! Patterns over whole items.

use super::{split_top_level, Matcher, PatternError};
use crate::model::{Item, ItemType, ItemTypeRegistry, MarkerPattern};
use std::fmt;

/// A compiled pattern over the values and markers of an item.
///
/// Typed patterns split their text on `:` into one part per key of the item
/// type and each part on `;` into the key's sub-fields; missing parts match
/// anything. Untyped patterns match fields positionally. A trailing
/// `'markers` adds a marker predicate on the item.
#[derive(Debug)]
pub struct ItemPattern {
    raw: String,
    item_type: Option<ItemType>,
    matchers: Vec<Matcher>,
    markers: MarkerPattern,
    group_count: usize,
}

impl ItemPattern {
    /// Compiles `raw` for items of `item_type`, or positionally when no
    /// type is given. `available` is the number of captures `\N` references
    /// may use.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern has more parts than the type, or if a
    /// segment does not compile.
    pub fn compile(
        item_type: Option<&ItemType>,
        raw: &str,
        available: usize,
        ignore_case: bool,
    ) -> Result<Self, PatternError> {
        let raw = raw.trim();
        let (body, markers) = match raw.split_once('\'') {
            Some((body, markers)) => (body.trim(), MarkerPattern::parse(markers, ignore_case)),
            None => (raw, MarkerPattern::parse("", ignore_case)),
        };

        let segments = match item_type {
            Some(t) => typed_segments(t, raw, body)?,
            None => untyped_segments(body),
        };
        let matchers = segments
            .iter()
            .map(|s| Matcher::compile(s, available, ignore_case))
            .collect::<Result<Vec<_>, _>>()?;
        let group_count = matchers.iter().map(Matcher::group_count).sum();

        Ok(Self {
            raw: raw.to_string(),
            item_type: item_type.cloned(),
            matchers,
            markers,
            group_count,
        })
    }

    /// Parses the filter form `[TYPE:]pattern['markers]`. The prefix is taken
    /// as a type only if `types` knows it.
    ///
    /// # Errors
    ///
    /// See [`ItemPattern::compile`].
    pub fn parse_match(
        text: &str,
        types: &ItemTypeRegistry,
        available: usize,
        ignore_case: bool,
    ) -> Result<Self, PatternError> {
        let text = text.trim();
        if let Some((prefix, rest)) = text.split_once(':') {
            if let Some(t) = types.find(prefix.trim()) {
                return Self::compile(Some(&t), rest, available, ignore_case);
            }
        }
        if let Some(t) = types.find(text) {
            return Self::compile(Some(&t), "", available, ignore_case);
        }
        Self::compile(None, text, available, ignore_case)
    }

    /// The pattern text.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The item type, if the pattern is typed.
    #[must_use]
    pub fn item_type(&self) -> Option<&ItemType> {
        self.item_type.as_ref()
    }

    /// Number of capture groups over all fields.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// Field matchers.
    #[must_use]
    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// Whether every item matches.
    #[must_use]
    pub fn is_match_all(&self) -> bool {
        self.item_type.is_none() && self.markers.is_trivial() && self.matchers.iter().all(Matcher::is_any)
    }

    /// Matches an item, resolving back references against `references`.
    /// Returns the captures of all fields on success.
    #[must_use]
    pub fn matches(&self, item: &Item, references: &[String]) -> Option<Vec<String>> {
        if let Some(t) = &self.item_type {
            if !t.matches(item.item_type()) {
                return None;
            }
        }
        let values = item.values();
        if self.matchers.len() > values.len() {
            return None;
        }
        if !self.markers.is_trivial() && !item.matches_markers(&self.markers) {
            return None;
        }
        let mut captures = Vec::with_capacity(self.group_count);
        for (matcher, value) in self.matchers.iter().zip(values) {
            if !matcher.matches(value, references, &mut captures) {
                return None;
            }
        }
        Some(captures)
    }

    /// Matches an item that may not use back references.
    #[must_use]
    pub fn is_match(&self, item: &Item) -> bool {
        self.matches(item, &[]).is_some()
    }
}

impl fmt::Display for ItemPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for m in &self.matchers {
            write!(f, "{sep}{m}")?;
            sep = ", ";
        }
        Ok(())
    }
}

fn typed_segments<'a>(
    item_type: &ItemType,
    raw: &str,
    body: &'a str,
) -> Result<Vec<&'a str>, PatternError> {
    // consecutive fields with equal keys form one key group
    let mut key_groups: Vec<(usize, usize)> = Vec::new();
    for i in 0..item_type.len() {
        if item_type.continues_key(i) {
            if let Some(last) = key_groups.last_mut() {
                last.1 += 1;
            }
        } else {
            key_groups.push((i, 1));
        }
    }

    let parts = if body.is_empty() {
        Vec::new()
    } else {
        split_top_level(body, ':')
    };
    if parts.len() > key_groups.len() {
        return Err(PatternError::TooManyFields {
            pattern: raw.to_string(),
            item_type: item_type.to_string(),
            expected: key_groups.len(),
            found: parts.len(),
        });
    }

    let mut segments = vec![""; item_type.len()];
    for (&part, &(first, width)) in parts.iter().zip(&key_groups) {
        let sub_fields = split_top_level(part, ';');
        if sub_fields.len() > width {
            return Err(PatternError::TooManySubFields {
                pattern: raw.to_string(),
                part: part.to_string(),
                key: item_type.keys()[first].clone(),
                expected: width,
                found: sub_fields.len(),
            });
        }
        for (offset, sub) in sub_fields.into_iter().enumerate() {
            segments[first + offset] = sub;
        }
    }
    Ok(segments)
}

fn untyped_segments(body: &str) -> Vec<&str> {
    if body.is_empty() {
        return Vec::new();
    }
    split_top_level(body, ':')
        .into_iter()
        .flat_map(|part| split_top_level(part, ';'))
        .collect()
}
