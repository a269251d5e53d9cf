//! Abbreviations and rule macros of rule files.

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors in abbreviation and macro definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefineError {
    /// Abbreviation names are uppercase letters, digits and underscores.
    #[error("abbreviation name '{0}' must be uppercase")]
    InvalidAbbreviation(String),

    /// An abbreviation is defined twice with different values.
    #[error("abbreviation {name} is already defined as '{existing}', not '{requested}'")]
    AbbreviationRedefined {
        /// Name of the abbreviation.
        name: String,
        /// Value of the first definition.
        existing: String,
        /// Value of the conflicting definition.
        requested: String,
    },

    /// A macro is defined twice with different bodies.
    #[error("macro {0} is already defined differently")]
    MacroRedefined(String),

    /// Two macro names differ only in repeated characters.
    #[error("macro name {name} is too similar to {existing}")]
    TooSimilar {
        /// Name of the new macro.
        name: String,
        /// Name of the existing macro.
        existing: String,
    },
}

/// A rule macro: body lines in which `\L` and `\R` stand for the left and
/// right pattern of a macro use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMacro {
    name: String,
    lines: Vec<String>,
}

impl RuleMacro {
    /// Creates a macro.
    #[must_use]
    pub fn new(name: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            name: name.into(),
            lines,
        }
    }

    /// Name of the macro.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Body lines, unexpanded.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Body lines with `\L` and `\R` replaced.
    #[must_use]
    pub fn expand(&self, left: &str, right: &str) -> Vec<String> {
        self.lines
            .iter()
            .map(|l| l.replace(r"\L", left).replace(r"\R", right))
            .collect()
    }
}

/// Abbreviations and macros defined so far in a rule set.
#[derive(Debug, Clone, Default)]
pub struct Defines {
    abbreviations: BTreeMap<String, String>,
    macros: BTreeMap<String, RuleMacro>,
}

impl Defines {
    /// Creates an empty set of definitions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `name` may be used as an abbreviation name.
    #[must_use]
    pub fn is_abbreviation_name(name: &str) -> bool {
        name.starts_with(|c: char| c.is_ascii_uppercase())
            && name
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    }

    /// Defines an abbreviation. The value may use earlier abbreviations.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid name or a different redefinition.
    pub fn define_abbreviation(&mut self, name: &str, value: &str) -> Result<(), DefineError> {
        if !Self::is_abbreviation_name(name) {
            return Err(DefineError::InvalidAbbreviation(name.to_string()));
        }
        let value = self.expand(value.trim());
        match self.abbreviations.get(name) {
            Some(existing) if *existing != value => Err(DefineError::AbbreviationRedefined {
                name: name.to_string(),
                existing: existing.clone(),
                requested: value,
            }),
            Some(_) => Ok(()),
            None => {
                self.abbreviations.insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    /// Value of an abbreviation.
    #[must_use]
    pub fn abbreviation(&self, name: &str) -> Option<&str> {
        self.abbreviations.get(name).map(String::as_str)
    }

    /// Replaces abbreviations in `pattern`, preferring longer names.
    #[must_use]
    pub fn expand(&self, pattern: &str) -> String {
        if self.abbreviations.is_empty() {
            return pattern.to_string();
        }
        let mut names: Vec<&String> = self.abbreviations.keys().collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let mut out = String::with_capacity(pattern.len());
        let mut rest = pattern;
        'scan: while let Some(c) = rest.chars().next() {
            for name in &names {
                if let Some(tail) = rest.strip_prefix(name.as_str()) {
                    out.push_str(&self.abbreviations[name.as_str()]);
                    rest = tail;
                    continue 'scan;
                }
            }
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
        out
    }

    /// Defines a macro.
    ///
    /// # Errors
    ///
    /// Returns an error for a different redefinition, or if the name is
    /// too similar to another macro's.
    pub fn define_macro(&mut self, rule_macro: RuleMacro) -> Result<(), DefineError> {
        if let Some(existing) = self.macros.get(rule_macro.name()) {
            return if *existing == rule_macro {
                Ok(())
            } else {
                Err(DefineError::MacroRedefined(rule_macro.name.clone()))
            };
        }
        let collapsed = collapse_repeats(rule_macro.name());
        if let Some(existing) = self
            .macros
            .keys()
            .find(|name| collapse_repeats(name) == collapsed)
        {
            return Err(DefineError::TooSimilar {
                name: rule_macro.name.clone(),
                existing: existing.clone(),
            });
        }
        self.macros.insert(rule_macro.name.clone(), rule_macro);
        Ok(())
    }

    /// A defined macro.
    #[must_use]
    pub fn rule_macro(&self, name: &str) -> Option<&RuleMacro> {
        self.macros.get(name)
    }

    /// Finds a macro use `left NAME right`, where `NAME` is a
    /// whitespace-separated word of the line. Returns the left side, the
    /// macro and the right side.
    #[must_use]
    pub fn find_macro_use<'a>(&'a self, line: &str) -> Option<(String, &'a RuleMacro, String)> {
        if self.macros.is_empty() {
            return None;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        words.iter().enumerate().find_map(|(i, word)| {
            self.macros.get(*word).map(|m| {
                (words[..i].join(" "), m, words[i + 1..].join(" "))
            })
        })
    }

    /// Number of abbreviations and macros.
    #[must_use]
    pub fn len(&self) -> usize {
        self.abbreviations.len() + self.macros.len()
    }

    /// Returns `true` if nothing is defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn collapse_repeats(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last = None;
    for c in name.chars() {
        if last != Some(c) {
            out.push(c);
        }
        last = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_abbreviation_wins() {
        let mut d = Defines::new();
        d.define_abbreviation("UI", "App.Ui.**").unwrap();
        d.define_abbreviation("UI_CORE", "App.Ui.Core.**").unwrap();
        assert_eq!(d.expand("UI_CORE"), "App.Ui.Core.**");
        assert_eq!(d.expand("UI"), "App.Ui.**");
        assert_eq!(d.expand("x.*"), "x.*");
    }

    #[test]
    fn abbreviation_values_use_earlier_abbreviations() {
        let mut d = Defines::new();
        d.define_abbreviation("APP", "My.App").unwrap();
        d.define_abbreviation("UI", "APP.Ui.**").unwrap();
        assert_eq!(d.abbreviation("UI"), Some("My.App.Ui.**"));
    }

    #[test]
    fn redefinition_must_be_identical() {
        let mut d = Defines::new();
        d.define_abbreviation("A", "x").unwrap();
        d.define_abbreviation("A", "x").unwrap();
        assert!(matches!(
            d.define_abbreviation("A", "y"),
            Err(DefineError::AbbreviationRedefined { .. })
        ));
    }

    #[test]
    fn lowercase_abbreviation_is_rejected() {
        let mut d = Defines::new();
        assert_eq!(
            d.define_abbreviation("ui", "x"),
            Err(DefineError::InvalidAbbreviation("ui".to_string()))
        );
    }

    #[test]
    fn macro_use_substitutes_sides() {
        let mut d = Defines::new();
        d.define_macro(RuleMacro::new(
            "===>",
            vec![r"\L ---> \R".to_string(), r"\R ---! \L".to_string()],
        ))
        .unwrap();
        let (left, m, right) = d.find_macro_use("a.** ===> b.**").unwrap();
        assert_eq!(m.expand(&left, &right), vec!["a.** ---> b.**", "b.** ---! a.**"]);
        assert!(d.find_macro_use("a ---> b").is_none());
    }

    #[test]
    fn similar_macro_names_are_rejected() {
        let mut d = Defines::new();
        d.define_macro(RuleMacro::new("===>", vec![])).unwrap();
        assert!(matches!(
            d.define_macro(RuleMacro::new("====>", vec![])),
            Err(DefineError::TooSimilar { .. })
        ));
        d.define_macro(RuleMacro::new("===>", vec![])).unwrap();
        assert_eq!(
            d.define_macro(RuleMacro::new("===>", vec!["x".to_string()])),
            Err(DefineError::MacroRedefined("===>".to_string()))
        );
        assert_eq!(d.len(), 1);
    }
}
