//! Marker sets and marker predicates.

use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// A set of string markers attached to an item or a dependency.
///
/// The backing set is only allocated once the first marker is added, so the
/// common unmarked case costs a single pointer. An unallocated set behaves
/// exactly like an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSet {
    markers: Option<Box<BTreeSet<String>>>,
    ignore_case: bool,
}

impl MarkerSet {
    /// Creates an empty, case-sensitive marker set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty marker set. With `ignore_case`, markers are stored
    /// and looked up in lowercase.
    #[must_use]
    pub fn with_ignore_case(ignore_case: bool) -> Self {
        Self {
            markers: None,
            ignore_case,
        }
    }

    /// Creates a marker set from an iterator of markers; empty strings are skipped.
    pub fn from_markers<I, S>(markers: I, ignore_case: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::with_ignore_case(ignore_case);
        set.extend(markers);
        set
    }

    /// Whether markers are compared case-insensitively.
    #[must_use]
    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    fn normalize(&self, marker: &str) -> String {
        normalize(marker, self.ignore_case)
    }

    /// Adds a marker. Returns `true` if it was not present before.
    pub fn add(&mut self, marker: &str) -> bool {
        let marker = self.normalize(marker);
        if marker.is_empty() {
            return false;
        }
        self.markers.get_or_insert_with(Box::default).insert(marker)
    }

    /// Adds all given markers.
    pub fn extend<I, S>(&mut self, markers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for m in markers {
            self.add(m.as_ref());
        }
    }

    /// Removes a marker. Returns `true` if it was present.
    pub fn remove(&mut self, marker: &str) -> bool {
        let marker = self.normalize(marker);
        let Some(set) = self.markers.as_mut() else {
            return false;
        };
        let removed = set.remove(&marker);
        if set.is_empty() {
            self.markers = None;
        }
        removed
    }

    /// Removes all markers.
    pub fn clear(&mut self) {
        self.markers = None;
    }

    /// Tests whether a marker is present.
    #[must_use]
    pub fn contains(&self, marker: &str) -> bool {
        let marker = self.normalize(marker);
        self.markers.as_ref().is_some_and(|s| s.contains(&marker))
    }

    /// Number of markers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.markers.as_ref().map_or(0, |s| s.len())
    }

    /// Returns `true` if there are no markers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.is_none()
    }

    /// Iterates the markers in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.markers.iter().flat_map(|s| s.iter().map(String::as_str))
    }

    /// Tests this set against a marker predicate.
    #[must_use]
    pub fn matches(&self, pattern: &MarkerPattern) -> bool {
        pattern.matches(self)
    }
}

impl fmt::Display for MarkerSet {
    /// Formats as `a+b+c`, the DIP marker syntax.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        for m in self.iter() {
            write!(f, "{sep}{m}")?;
            sep = "+";
        }
        Ok(())
    }
}

impl Serialize for MarkerSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

fn normalize(marker: &str, ignore_case: bool) -> String {
    let marker = marker.trim();
    if ignore_case {
        marker.to_lowercase()
    } else {
        marker.to_string()
    }
}

/// A predicate over a marker set: all `present` markers must be set and no
/// `absent` marker may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerPattern {
    present: BTreeSet<String>,
    absent: BTreeSet<String>,
    ignore_case: bool,
}

impl MarkerPattern {
    /// Parses `a & b & ~c`. Tokens prefixed with `~` are absence requirements;
    /// empty tokens and a lone `~` are ignored.
    #[must_use]
    pub fn parse(text: &str, ignore_case: bool) -> Self {
        let mut pattern = Self {
            ignore_case,
            ..Self::default()
        };
        for token in text.split('&').map(str::trim) {
            if token.is_empty() || token == "~" {
                continue;
            }
            if let Some(absent) = token.strip_prefix('~') {
                pattern.absent.insert(normalize(absent, ignore_case));
            } else {
                pattern.present.insert(normalize(token, ignore_case));
            }
        }
        pattern
    }

    /// Builds a pattern from explicit marker lists.
    pub fn new<P, A, S>(present: P, absent: A, ignore_case: bool) -> Self
    where
        P: IntoIterator<Item = S>,
        A: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            present: present
                .into_iter()
                .map(|m| normalize(m.as_ref(), ignore_case))
                .collect(),
            absent: absent
                .into_iter()
                .map(|m| normalize(m.as_ref(), ignore_case))
                .collect(),
            ignore_case,
        }
    }

    /// Markers that must be present.
    pub fn present(&self) -> impl Iterator<Item = &str> {
        self.present.iter().map(String::as_str)
    }

    /// Markers that must be absent.
    pub fn absent(&self) -> impl Iterator<Item = &str> {
        self.absent.iter().map(String::as_str)
    }

    /// Returns `true` if this pattern accepts every marker set.
    #[must_use]
    pub fn is_trivial(&self) -> bool {
        self.present.is_empty() && self.absent.is_empty()
    }

    /// Evaluates the predicate.
    #[must_use]
    pub fn matches(&self, markers: &MarkerSet) -> bool {
        if markers.is_empty() {
            return self.present.is_empty();
        }
        let has = |m: &String| {
            if self.ignore_case && !markers.ignore_case() {
                markers.iter().any(|x| x.eq_ignore_ascii_case(m))
            } else {
                markers.contains(m)
            }
        };
        self.present.iter().all(has) && !self.absent.iter().any(has)
    }
}

impl fmt::Display for MarkerPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<String> = self
            .present
            .iter()
            .cloned()
            .chain(self.absent.iter().map(|a| format!("~{a}")))
            .collect();
        write!(f, "{}", tokens.join("&"))
    }
}
