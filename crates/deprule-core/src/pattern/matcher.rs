//! Matchers for single item fields.
//!
//! A segment compiles to one of:
//!
//! - nothing (empty segment): matches every value
//! - a fixed string: exact comparison
//! - a regular expression, used as written, if the segment starts with `^`
//!   or ends with `$`
//! - a wildcard path, if the segment contains one of `*()|\`: `.` matches a
//!   period, `*` one identifier, `**` any number of dot-separated
//!   identifiers
//!
//! Parenthesized parts capture. A matcher on the used side of a rule may
//! refer to captures of the using side with `\1`, `\2`, ...

use super::PatternError;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

const WILDCARD_CHARS: &[char] = &['*', '(', ')', '|', '\\'];
const CACHE_LIMIT: usize = 512;

/// Compiled matcher for one field value.
#[derive(Debug)]
pub enum Matcher {
    /// Matches every value.
    Any,
    /// Exact string comparison.
    Fixed {
        /// Expected value, lowercased when ignoring case.
        value: String,
        /// Compare case-insensitively.
        ignore_case: bool,
    },
    /// Regular expression without back references.
    Regex {
        /// The segment as written.
        segment: String,
        /// Compiled expression.
        regex: Regex,
    },
    /// Regular expression with back references, compiled per distinct set
    /// of referenced captures.
    BackRef(BackRefMatcher),
}

/// A regular expression template containing `\N` references.
#[derive(Debug)]
pub struct BackRefMatcher {
    segment: String,
    template: String,
    ignore_case: bool,
    cache: Mutex<HashMap<String, Regex>>,
}

impl Matcher {
    /// Compiles a segment. `available` is the number of captures that `\N`
    /// references may use; zero forbids references.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid regular expressions and for references
    /// beyond `available`.
    pub fn compile(segment: &str, available: usize, ignore_case: bool) -> Result<Self, PatternError> {
        let segment = segment.trim();
        if segment.is_empty() {
            return Ok(Self::Any);
        }
        let template = if segment.starts_with('^') || segment.ends_with('$') {
            segment.to_string()
        } else if segment.contains(WILDCARD_CHARS) {
            wildcard_to_regex(segment)
        } else {
            return Ok(Self::Fixed {
                value: if ignore_case {
                    segment.to_lowercase()
                } else {
                    segment.to_string()
                },
                ignore_case,
            });
        };

        let references = back_references(&template);
        if let Some(&index) = references.iter().max() {
            if index == 0 || index > available {
                return Err(PatternError::BackReference {
                    segment: segment.to_string(),
                    index,
                    available,
                });
            }
            let trial = substitute(&template, &vec![String::new(); available]);
            build_regex(segment, &trial, ignore_case)?;
            return Ok(Self::BackRef(BackRefMatcher {
                segment: segment.to_string(),
                template,
                ignore_case,
                cache: Mutex::new(HashMap::new()),
            }));
        }

        Ok(Self::Regex {
            segment: segment.to_string(),
            regex: build_regex(segment, &template, ignore_case)?,
        })
    }

    /// Number of capture groups this matcher contributes.
    #[must_use]
    pub fn group_count(&self) -> usize {
        match self {
            Self::Any | Self::Fixed { .. } => 0,
            Self::Regex { regex, .. } => regex.captures_len() - 1,
            Self::BackRef(m) => m.group_count(),
        }
    }

    /// Matches `value`, resolving back references against `references`
    /// (1-based) and appending this matcher's captures to `captures`.
    /// Unmatched optional groups capture the empty string.
    pub fn matches(&self, value: &str, references: &[String], captures: &mut Vec<String>) -> bool {
        match self {
            Self::Any => true,
            Self::Fixed {
                value: expected,
                ignore_case,
            } => {
                if *ignore_case {
                    value.chars().flat_map(char::to_lowercase).eq(expected.chars())
                } else {
                    value == expected
                }
            }
            Self::Regex { regex, .. } => capture_into(regex, value, captures),
            Self::BackRef(m) => {
                let pattern = substitute(&m.template, references);
                let mut cache = m.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                if !cache.contains_key(&pattern) {
                    let Ok(regex) = build_regex(&m.segment, &pattern, m.ignore_case) else {
                        return false;
                    };
                    if cache.len() >= CACHE_LIMIT {
                        cache.clear();
                    }
                    cache.insert(pattern.clone(), regex);
                }
                cache
                    .get(&pattern)
                    .is_some_and(|regex| capture_into(regex, value, captures))
            }
        }
    }

    /// Whether this matcher accepts every value.
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl BackRefMatcher {
    fn group_count(&self) -> usize {
        let trial = substitute(&self.template, &[]);
        Regex::new(&trial).map_or(0, |r| r.captures_len() - 1)
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Fixed { value, .. } => write!(f, "={value}"),
            Self::Regex { regex, .. } => write!(f, "/{}/", regex.as_str()),
            Self::BackRef(m) => write!(f, "/{}/", m.template),
        }
    }
}

fn build_regex(segment: &str, pattern: &str, ignore_case: bool) -> Result<Regex, PatternError> {
    RegexBuilder::new(pattern)
        .case_insensitive(ignore_case)
        .build()
        .map_err(|source| PatternError::InvalidRegex {
            segment: segment.to_string(),
            source: Box::new(source),
        })
}

fn capture_into(regex: &Regex, value: &str, captures: &mut Vec<String>) -> bool {
    let Some(found) = regex.captures(value) else {
        return false;
    };
    captures.extend(
        found
            .iter()
            .skip(1)
            .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string())),
    );
    true
}

/// Translates a wildcard segment into an anchored regular expression.
/// Back references stay in the output as `\N`.
pub(crate) fn wildcard_to_regex(segment: &str) -> String {
    let mut out = String::from("^(?:");
    let mut chars = segment.chars().peekable();
    let mut previous: Option<char> = None;
    while let Some(c) = chars.next() {
        let at_start = previous.map_or(true, is_segment_boundary);
        previous = Some(c);
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                if out.ends_with(r"\.") {
                    out.truncate(out.len() - 2);
                    out.push_str(r"(?:\.[^.]+)*");
                } else if chars.peek() == Some(&'.') {
                    chars.next();
                    previous = Some('.');
                    out.push_str(r"(?:[^.]+\.)*");
                } else {
                    out.push_str(r"(?:[^.]+(?:\.[^.]+)*)?");
                }
            }
            '*' if at_start && chars.peek().map_or(true, |&n| is_segment_boundary(n)) => {
                out.push_str("[^.]+");
            }
            '*' => out.push_str("[^.]*"),
            '.' | '/' => out.push_str(r"\."),
            '(' | ')' | '|' => out.push(c),
            '\\' => match chars.next() {
                Some(d) if d.is_ascii_digit() => {
                    out.push('\\');
                    out.push(d);
                    while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                        out.push(d);
                        chars.next();
                    }
                }
                Some(other) => out.push_str(&regex::escape(&other.to_string())),
                None => out.push_str(r"\\"),
            },
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push_str(")$");
    out
}

fn is_segment_boundary(c: char) -> bool {
    matches!(c, '.' | '/' | '(' | ')' | '|')
}

/// Indices of all `\N` references in a regular expression template.
fn back_references(template: &str) -> Vec<usize> {
    let mut found = Vec::new();
    scan(template, |piece| {
        if let Piece::Reference(index) = piece {
            found.push(index);
        }
    });
    found
}

/// Replaces `\N` by the escaped `references[N - 1]`; missing references
/// become empty.
fn substitute(template: &str, references: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    scan(template, |piece| match piece {
        Piece::Text(text) => out.push_str(text),
        Piece::Reference(index) => {
            if let Some(value) = index.checked_sub(1).and_then(|i| references.get(i)) {
                out.push_str(&regex::escape(value));
            }
        }
    });
    out
}

enum Piece<'a> {
    Text(&'a str),
    Reference(usize),
}

fn scan<'a>(template: &'a str, mut visit: impl FnMut(Piece<'a>)) {
    let bytes = template.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            i += 1;
            continue;
        }
        let digits_start = i + 1;
        let mut end = digits_start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end == digits_start {
            // escaped character, keep both bytes
            i += 2;
            continue;
        }
        visit(Piece::Text(&template[start..i]));
        let index = template[digits_start..end].parse().unwrap_or(usize::MAX);
        visit(Piece::Reference(index));
        start = end;
        i = end;
    }
    if start < template.len() {
        visit(Piece::Text(&template[start..]));
    }
}
