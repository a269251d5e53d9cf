//! Dependencies: counted, markable edges between two items.

use super::{Item, MarkerSet};
use crate::types::Classification;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Arrow separating the three sections of a DIP line.
pub(crate) const DIP_ARROW: &str = "=>";

/// Where a dependency was found in the analyzed sources.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    /// File name or path, as reported by the producer.
    pub file: String,
    /// Line number (1-indexed), if known.
    pub line: Option<u32>,
}

impl SourceLocation {
    /// Creates a location.
    #[must_use]
    pub fn new(file: impl Into<String>, line: Option<u32>) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Parses the DIP form `file:line` or `file`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some((file, line)) = text.rsplit_once(':') {
            if let Ok(line) = line.parse() {
                return Some(Self::new(file, Some(line)));
            }
        }
        Some(Self::new(text, None))
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}", self.file),
            None => f.write_str(&self.file),
        }
    }
}

/// A directed edge from a using item to a used item.
///
/// `ct` counts the underlying usages; `questionable_ct` and `bad_ct` count
/// how many of those were classified as questionable or bad. The counts are
/// not forced to be consistent, see [`Dependency::is_consistent`].
#[derive(Debug, Clone, Serialize)]
pub struct Dependency {
    using: Item,
    used: Item,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<SourceLocation>,
    #[serde(skip_serializing_if = "MarkerSet::is_empty")]
    markers: MarkerSet,
    ct: u32,
    questionable_ct: u32,
    bad_ct: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    example_info: Option<String>,
    #[serde(skip)]
    input: Option<Arc<str>>,
}

impl Dependency {
    /// Creates an unmarked dependency with `ct` usages and no violations.
    #[must_use]
    pub fn new(using: Item, used: Item, ct: u32) -> Self {
        Self {
            using,
            used,
            source: None,
            markers: MarkerSet::new(),
            ct,
            questionable_ct: 0,
            bad_ct: 0,
            example_info: None,
            input: None,
        }
    }

    /// Sets the source location.
    #[must_use]
    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }

    /// Replaces the marker set.
    #[must_use]
    pub fn with_markers(mut self, markers: MarkerSet) -> Self {
        self.markers = markers;
        self
    }

    /// Adds markers given as text separated by `&`, `+` or `,`.
    #[must_use]
    pub fn with_marker_text(mut self, text: &str) -> Self {
        self.markers.extend(text.split(['&', '+', ',']));
        self
    }

    /// Sets questionable and bad counts.
    #[must_use]
    pub fn with_counts(mut self, questionable_ct: u32, bad_ct: u32) -> Self {
        self.questionable_ct = questionable_ct;
        self.bad_ct = bad_ct;
        self
    }

    /// Sets the example info.
    #[must_use]
    pub fn with_example_info(mut self, example_info: impl Into<String>) -> Self {
        self.example_info = Some(example_info.into());
        self
    }

    /// Sets the name of the input batch that produced this dependency.
    #[must_use]
    pub fn with_input(mut self, input: impl Into<Arc<str>>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// The using item.
    #[must_use]
    pub fn using(&self) -> &Item {
        &self.using
    }

    /// The used item.
    #[must_use]
    pub fn used(&self) -> &Item {
        &self.used
    }

    /// Whether using and used item are the same.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.using == self.used
    }

    /// Source location, if known.
    #[must_use]
    pub fn source(&self) -> Option<&SourceLocation> {
        self.source.as_ref()
    }

    /// Name of the input batch, if known.
    #[must_use]
    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    /// The dependency's markers.
    #[must_use]
    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    /// Mutable access to the dependency's markers.
    pub fn markers_mut(&mut self) -> &mut MarkerSet {
        &mut self.markers
    }

    /// Total usage count.
    #[must_use]
    pub fn ct(&self) -> u32 {
        self.ct
    }

    /// Questionable usage count.
    #[must_use]
    pub fn questionable_ct(&self) -> u32 {
        self.questionable_ct
    }

    /// Bad usage count.
    #[must_use]
    pub fn bad_ct(&self) -> u32 {
        self.bad_ct
    }

    /// `ct - questionable_ct - bad_ct`; negative for inconsistent counts.
    #[must_use]
    pub fn ok_ct(&self) -> i64 {
        i64::from(self.ct) - i64::from(self.questionable_ct) - i64::from(self.bad_ct)
    }

    /// `questionable_ct + bad_ct`.
    #[must_use]
    pub fn not_ok_ct(&self) -> u64 {
        u64::from(self.questionable_ct) + u64::from(self.bad_ct)
    }

    /// Whether the questionable and bad counts together fit into `ct`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.ok_ct() >= 0
    }

    /// Representative violating usage, if any.
    #[must_use]
    pub fn example_info(&self) -> Option<&str> {
        self.example_info.as_deref()
    }

    /// Classifies all usages as bad.
    pub fn mark_as_bad(&mut self) {
        self.set_bad_ct(self.ct);
    }

    /// Classifies one more usage as bad.
    pub fn increment_bad(&mut self) {
        self.set_bad_ct(self.bad_ct.saturating_add(1));
    }

    /// Clears the bad count.
    pub fn reset_bad(&mut self) {
        self.bad_ct = 0;
    }

    fn set_bad_ct(&mut self, value: u32) {
        // the first bad example replaces a questionable one
        if self.bad_ct == 0 || self.example_info.is_none() {
            self.example_info = Some(self.example("---!"));
        }
        self.bad_ct = value;
    }

    /// Classifies all usages as questionable.
    pub fn mark_as_questionable(&mut self) {
        self.set_questionable_ct(self.ct);
    }

    /// Classifies one more usage as questionable.
    pub fn increment_questionable(&mut self) {
        self.set_questionable_ct(self.questionable_ct.saturating_add(1));
    }

    /// Clears the questionable count.
    pub fn reset_questionable(&mut self) {
        self.questionable_ct = 0;
    }

    fn set_questionable_ct(&mut self, value: u32) {
        if (self.bad_ct == 0 && self.questionable_ct == 0) || self.example_info.is_none() {
            self.example_info = Some(self.example("---?"));
        }
        self.questionable_ct = value;
    }

    fn example(&self, arrow: &str) -> String {
        format!("{} {arrow} {}", self.using.as_string(), self.used.as_string())
    }

    /// Records a rule check outcome. Repeating the same outcome leaves the
    /// dependency unchanged; `Ok` never changes counts.
    pub fn apply_check_result(&mut self, result: Classification) {
        match result {
            Classification::Ok => {}
            Classification::Questionable => self.mark_as_questionable(),
            Classification::Bad => self.mark_as_bad(),
        }
    }

    /// One-line description of a violating dependency.
    #[must_use]
    pub fn not_ok_message(&self) -> String {
        let noun = if self.ct > 1 { "ependencies" } else { "ependency" };
        let (prefix, counts) = match (self.bad_ct > 0, self.questionable_ct > 0) {
            (true, true) => (
                "Bad and questionable d",
                format!("{};{}", self.bad_ct, self.questionable_ct),
            ),
            (true, false) => ("Bad d", self.bad_ct.to_string()),
            (false, true) => ("Questionable d", format!(";{}", self.questionable_ct)),
            (false, false) => ("D", String::new()),
        };
        let mut message = format!("{prefix}{noun} {} --{counts}-> {}", self.using, self.used);
        if let Some(source) = &self.source {
            let at = if self.ct > 1 { "e.g. at" } else { "at" };
            message.push_str(&format!(" ({at} {source})"));
        }
        message
    }

    /// Adds the other dependency's markers and counts to this one. The
    /// example info is kept if already set.
    pub fn aggregate_markers_and_counts(&mut self, other: &Dependency) {
        self.markers.extend(other.markers.iter());
        self.ct = self.ct.saturating_add(other.ct);
        self.questionable_ct = self.questionable_ct.saturating_add(other.questionable_ct);
        self.bad_ct = self.bad_ct.saturating_add(other.bad_ct);
        if self.example_info.is_none() {
            self.example_info.clone_from(&other.example_info);
        }
    }

    /// DIP line: `using => markers;ct;q;b;source;example => used`.
    #[must_use]
    pub fn as_dip_line(&self, with_example_info: bool) -> String {
        let source = self.source.as_ref().map(ToString::to_string).unwrap_or_default();
        let example = if with_example_info {
            self.example_info.as_deref().unwrap_or_default()
        } else {
            ""
        };
        format!(
            "{} {DIP_ARROW} {};{};{};{};{source};{example} {DIP_ARROW} {}",
            self.using.as_full_string(),
            self.markers,
            self.ct,
            self.questionable_ct,
            self.bad_ct,
            self.used.as_full_string()
        )
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ---> {}", self.using, self.used)
    }
}

/// Merges dependencies with equal using and used item, keeping the position
/// of each pair's first occurrence.
pub fn aggregate_all_edges(dependencies: Vec<Dependency>) -> Vec<Dependency> {
    let mut index: HashMap<(Item, Item), usize> = HashMap::new();
    let mut result: Vec<Dependency> = Vec::new();
    for dependency in dependencies {
        let key = (dependency.using.clone(), dependency.used.clone());
        if let Some(&i) = index.get(&key) {
            result[i].aggregate_markers_and_counts(&dependency);
        } else {
            index.insert(key, result.len());
            result.push(dependency);
        }
    }
    for dependency in result.iter().filter(|d| !d.is_consistent()) {
        warn!(
            dependency = %dependency,
            ct = dependency.ct,
            questionable = dependency.questionable_ct,
            bad = dependency.bad_ct,
            "Aggregated counts exceed total count"
        );
    }
    result
}

/// Builds the outgoing adjacency of `dependencies`, as indices into the
/// slice. Every item appearing on either side gets an entry, possibly empty.
#[must_use]
pub fn collect_outgoing(dependencies: &[Dependency]) -> HashMap<Item, Vec<usize>> {
    collect_outgoing_of(dependencies, 0..dependencies.len())
}

/// Like [`collect_outgoing`], restricted to the dependencies at `selected`.
///
/// # Panics
///
/// Panics if an index is out of bounds.
#[must_use]
pub fn collect_outgoing_of(
    dependencies: &[Dependency],
    selected: impl IntoIterator<Item = usize>,
) -> HashMap<Item, Vec<usize>> {
    let mut outgoing: HashMap<Item, Vec<usize>> = HashMap::new();
    for i in selected {
        let dependency = &dependencies[i];
        outgoing.entry(dependency.used.clone()).or_default();
        outgoing.entry(dependency.using.clone()).or_default().push(i);
    }
    outgoing
}
