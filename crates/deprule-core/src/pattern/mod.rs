//! Item patterns, field matchers and dependency filters.

mod dependency_match;
mod item_pattern;
mod matcher;

pub use dependency_match::{matches_filters, DependencyMatch};
pub use item_pattern::ItemPattern;
pub use matcher::Matcher;

use thiserror::Error;

/// Errors raised while compiling patterns.
#[derive(Debug, Error)]
pub enum PatternError {
    /// A segment is not a valid regular expression.
    #[error("invalid regular expression in '{segment}': {source}")]
    InvalidRegex {
        /// The segment as written.
        segment: String,
        /// Underlying regex error.
        #[source]
        source: Box<regex::Error>,
    },

    /// A back reference points past the available captures.
    #[error("back reference \\{index} in '{segment}' exceeds the {available} available capture group(s)")]
    BackReference {
        /// The segment as written.
        segment: String,
        /// Referenced group.
        index: usize,
        /// Number of groups on the using side.
        available: usize,
    },

    /// A pattern has more `:`-separated parts than its type has key groups.
    #[error("pattern '{pattern}' has {found} parts, but item type {item_type} has only {expected}")]
    TooManyFields {
        /// The pattern.
        pattern: String,
        /// Declaration of the item type.
        item_type: String,
        /// Key groups of the type.
        expected: usize,
        /// Parts in the pattern.
        found: usize,
    },

    /// A part has more `;`-separated sub-fields than its key has.
    #[error("part '{part}' of pattern '{pattern}' has {found} sub-fields, but key {key} has only {expected}")]
    TooManySubFields {
        /// The pattern.
        pattern: String,
        /// The offending part.
        part: String,
        /// Key name.
        key: String,
        /// Sub-fields of the key.
        expected: usize,
        /// Sub-fields in the part.
        found: usize,
    },

    /// A dependency filter lacks its arrow.
    #[error("dependency match '{0}' must have the form 'using -- markers -> used' or 'using ---> used'")]
    InvalidDependencyMatch(String),
}

/// Splits `text` on `separator` outside parentheses and brackets. A
/// backslash protects the following character.
pub(crate) fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
