//! Dependency rules, rule groups and the rule-set file format.
//!
//! A rule set is a text file:
//!
//! ```text
//! // comments start with // or #
//! + common.deprules                      include another file
//! $ DOTNET(Namespace:Class) ---> DOTNET  item types of the following rules
//! UI := MyApp.Ui.**                       abbreviation
//! UI ---> MyApp.Core.**                   allowed
//!    ---? System.IO.**                    questionable, same left side
//! ** ---! MyApp.Ui.**                     forbidden
//! ** ---+> System.**                      allowed, plus ** ---> B for each System.** ---> B
//! MyApp.Core.** {                         rules only for matching using items
//!     ---> MyApp.Core.**
//! }
//! ```
//!
//! Rules and rule groups need a preceding `$` line.

mod defines;
mod group;
mod parser;
mod rule;

pub use defines::{DefineError, Defines, RuleMacro};
pub use group::{DependencyRuleGroup, RuleKind, INITIAL_REORDER_THRESHOLD};
pub use parser::{RuleSet, RuleSetParser};
pub use rule::{DependencyRule, RuleRepresentation};

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::path::PathBuf;
use thiserror::Error;

/// Rule arrow for allowed dependencies.
pub const MAY_USE: &str = "--->";
/// Rule arrow for questionable dependencies.
pub const MAY_USE_WITH_WARNING: &str = "---?";
/// Rule arrow for forbidden dependencies.
pub const MUST_NOT_USE: &str = "---!";
/// Rule arrow for allowed dependencies extended along other allowed rules.
pub const MAY_USE_RECURSIVE: &str = "---+>";

/// Errors in rule-set definitions.
#[derive(Debug, Error, Diagnostic)]
pub enum RuleSetError {
    /// The rule file could not be read.
    #[error("cannot read rule file {path}: {source}")]
    #[diagnostic(code(deprule::rules::io))]
    Io {
        /// Path of the rule file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A line of a rule file is invalid.
    #[error("{file}:{line}: {message}")]
    #[diagnostic(code(deprule::rules::definition))]
    Definition {
        /// Name of the rule file.
        file: String,
        /// Line number (1-indexed).
        line: usize,
        /// What is wrong.
        message: String,
        /// Text of the rule file.
        #[source_code]
        src: NamedSource<String>,
        /// Span of the offending line.
        #[label("in this line")]
        span: SourceSpan,
    },

    /// A file includes itself, directly or indirectly.
    #[error("{file}:{line}: include cycle through {included}")]
    #[diagnostic(code(deprule::rules::include_cycle))]
    IncludeCycle {
        /// Name of the including file.
        file: String,
        /// Line of the include.
        line: usize,
        /// The file included again.
        included: PathBuf,
    },
}

impl RuleSetError {
    /// Builds a [`RuleSetError::Definition`] pointing at line `line` of
    /// `text`.
    #[must_use]
    pub fn definition(file: &str, text: &str, line: usize, message: impl Into<String>) -> Self {
        let (offset, length) = line_span(text, line);
        Self::Definition {
            file: file.to_string(),
            line,
            message: message.into(),
            src: NamedSource::new(file, text.to_string()),
            span: (offset, length).into(),
        }
    }

    /// Line number of the error, if it refers to a line.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Io { .. } => None,
            Self::Definition { line, .. } | Self::IncludeCycle { line, .. } => Some(*line),
        }
    }
}

fn line_span(text: &str, line: usize) -> (usize, usize) {
    let mut offset = 0;
    for (i, l) in text.split_inclusive('\n').enumerate() {
        if i + 1 == line {
            return (offset, l.trim_end_matches(['\r', '\n']).len());
        }
        offset += l.len();
    }
    (text.len(), 0)
}
