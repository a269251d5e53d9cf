//! Rule-file parsing.

use super::{
    Defines, DependencyRule, DependencyRuleGroup, RuleKind, RuleMacro, RuleRepresentation,
    RuleSetError, MAY_USE, MAY_USE_RECURSIVE, MAY_USE_WITH_WARNING, MUST_NOT_USE,
};
use crate::model::{ItemType, ItemTypeRegistry};
use crate::pattern::ItemPattern;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

const ARROWS: [(&str, RuleKind); 4] = [
    (MAY_USE_RECURSIVE, RuleKind::Allowed),
    (MAY_USE, RuleKind::Allowed),
    (MAY_USE_WITH_WARNING, RuleKind::Questionable),
    (MUST_NOT_USE, RuleKind::Forbidden),
];

const MISSING_TYPES: &str = "item types not defined, a $ line is missing before this rule";

/// The rule groups of one rule file and its includes. The global group
/// comes first.
#[derive(Debug)]
pub struct RuleSet {
    source: String,
    groups: Vec<DependencyRuleGroup>,
    defines: Defines,
}

impl RuleSet {
    /// Name of the rule file.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Rule groups, global group first.
    #[must_use]
    pub fn groups(&self) -> &[DependencyRuleGroup] {
        &self.groups
    }

    /// Mutable rule groups.
    pub fn groups_mut(&mut self) -> &mut [DependencyRuleGroup] {
        &mut self.groups
    }

    /// Consumes the rule set, returning its groups.
    #[must_use]
    pub fn into_groups(self) -> Vec<DependencyRuleGroup> {
        self.groups
    }

    /// Abbreviations and macros of the file.
    #[must_use]
    pub fn defines(&self) -> &Defines {
        &self.defines
    }

    /// Total number of rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|g| g.all_rules().count()).sum()
    }

    /// Returns `true` if no group has rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(DependencyRuleGroup::is_empty)
    }
}

/// Parses rule files, declaring the item types they name in a registry.
pub struct RuleSetParser<'a> {
    types: &'a mut ItemTypeRegistry,
    ignore_case: bool,
    adaptive_reordering: bool,
    include_stack: Vec<PathBuf>,
}

struct MacroDefinition {
    name: String,
    line: usize,
    lines: Vec<String>,
}

/// Mutable state while reading one rule set.
struct State {
    defines: Defines,
    global: DependencyRuleGroup,
    aspects: Vec<DependencyRuleGroup>,
    current_aspect: Option<DependencyRuleGroup>,
    using_type: Option<ItemType>,
    used_type: Option<ItemType>,
    previous_left: Option<String>,
    open_macro: Option<MacroDefinition>,
}

/// A file being read: its name, text and directory for includes.
struct Source<'s> {
    name: &'s str,
    text: &'s str,
    dir: Option<&'s Path>,
}

impl Source<'_> {
    fn error(&self, line: usize, message: impl Into<String>) -> RuleSetError {
        RuleSetError::definition(self.name, self.text, line, message)
    }
}

impl<'a> RuleSetParser<'a> {
    /// Creates a parser that declares and looks up item types in `types`.
    pub fn new(types: &'a mut ItemTypeRegistry) -> Self {
        Self {
            types,
            ignore_case: false,
            adaptive_reordering: true,
            include_stack: Vec::new(),
        }
    }

    /// Compiles patterns case-insensitively.
    #[must_use]
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Enables or disables rule reordering in the created groups.
    #[must_use]
    pub fn adaptive_reordering(mut self, enabled: bool) -> Self {
        self.adaptive_reordering = enabled;
        self
    }

    /// Reads and parses a rule file.
    ///
    /// # Errors
    ///
    /// Returns [`RuleSetError`] if the file or an include cannot be read or
    /// contains an invalid line.
    pub fn parse_file(&mut self, path: &Path) -> Result<RuleSet, RuleSetError> {
        let mut state = self.new_state();
        self.read_file(path, &mut state, 0, "")?;
        Ok(Self::finish(path.display().to_string(), state))
    }

    /// Parses rule text. Includes are resolved relative to the current
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`RuleSetError`] for an invalid line or unreadable include.
    pub fn parse_str(&mut self, name: &str, text: &str) -> Result<RuleSet, RuleSetError> {
        let mut state = self.new_state();
        let source = Source {
            name,
            text,
            dir: None,
        };
        self.parse_text(&source, &mut state)?;
        Ok(Self::finish(name.to_string(), state))
    }

    fn new_state(&self) -> State {
        State {
            defines: Defines::new(),
            global: DependencyRuleGroup::global().adaptive_reordering(self.adaptive_reordering),
            aspects: Vec::new(),
            current_aspect: None,
            using_type: None,
            used_type: None,
            previous_left: None,
            open_macro: None,
        }
    }

    fn finish(source: String, state: State) -> RuleSet {
        let mut groups = vec![state.global];
        for aspect in state.aspects {
            match groups
                .iter_mut()
                .skip(1)
                .find(|g| g.selector_text() == aspect.selector_text())
            {
                Some(existing) => existing.combine(aspect),
                None => groups.push(aspect),
            }
        }
        debug!(
            source = %source,
            groups = groups.len(),
            "Parsed rule set"
        );
        RuleSet {
            source,
            groups,
            defines: state.defines,
        }
    }

    fn read_file(
        &mut self,
        path: &Path,
        state: &mut State,
        include_line: usize,
        includer: &str,
    ) -> Result<(), RuleSetError> {
        let canonical = fs::canonicalize(path).map_err(|source| RuleSetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if self.include_stack.contains(&canonical) {
            return Err(RuleSetError::IncludeCycle {
                file: includer.to_string(),
                line: include_line,
                included: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path).map_err(|source| RuleSetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path.display().to_string();
        let source = Source {
            name: &name,
            text: &text,
            dir: path.parent(),
        };

        self.include_stack.push(canonical);
        let result = self.parse_text(&source, state);
        self.include_stack.pop();
        result
    }

    fn parse_text(&mut self, source: &Source<'_>, state: &mut State) -> Result<(), RuleSetError> {
        let aspect_open_before = state.current_aspect.is_some();
        let mut aspect_line = 0;

        for (i, raw_line) in source.text.lines().enumerate() {
            let line_no = i + 1;
            let line = raw_line.trim();

            if state.open_macro.is_some() {
                if line == "=:" {
                    if let Some(open) = state.open_macro.take() {
                        state
                            .defines
                            .define_macro(RuleMacro::new(open.name, open.lines))
                            .map_err(|e| source.error(line_no, e.to_string()))?;
                    }
                } else if let Some(open) = &mut state.open_macro {
                    open.lines.push(line.to_string());
                }
                continue;
            }

            let had_aspect = state.current_aspect.is_some();
            self.parse_line(source, state, line_no, line)?;
            if !had_aspect && state.current_aspect.is_some() {
                aspect_line = line_no;
            }
        }

        if let Some(open) = &state.open_macro {
            return Err(source.error(
                open.line,
                format!("macro {} is not closed with =:", open.name),
            ));
        }
        if !aspect_open_before && state.current_aspect.is_some() {
            return Err(source.error(aspect_line, "rule group is not closed with }"));
        }
        Ok(())
    }

    fn parse_line(
        &mut self,
        source: &Source<'_>,
        state: &mut State,
        line_no: usize,
        line: &str,
    ) -> Result<(), RuleSetError> {
        if line.is_empty() || line.starts_with("//") || line.starts_with('#') {
            return Ok(());
        }

        if let Some(path) = line.strip_prefix('+') {
            return self.include(source, state, line_no, path.trim());
        }

        if let Some(decl) = line.strip_prefix('$') {
            return self.declare_types(source, state, line_no, decl);
        }

        if let Some((name, value)) = line.split_once(":=") {
            let name = name.trim();
            let value = value.trim();
            if value.is_empty() {
                state.open_macro = Some(MacroDefinition {
                    name: name.to_string(),
                    line: line_no,
                    lines: Vec::new(),
                });
                return Ok(());
            }
            return state
                .defines
                .define_abbreviation(name, value)
                .map_err(|e| source.error(line_no, e.to_string()));
        }

        if line == "}" {
            return match state.current_aspect.take() {
                Some(aspect) => {
                    state.aspects.push(aspect);
                    state.previous_left = None;
                    Ok(())
                }
                None => Err(source.error(line_no, "} without rule group")),
            };
        }

        if let Some(selector) = line.strip_suffix('{') {
            if state.current_aspect.is_some() {
                return Err(source.error(line_no, "rule groups cannot be nested"));
            }
            let Some(using_type) = &state.using_type else {
                return Err(source.error(line_no, MISSING_TYPES));
            };
            let selector = selector.trim();
            let expanded = state.defines.expand(selector);
            let pattern = ItemPattern::compile(
                Some(using_type),
                &expanded,
                0,
                self.ignore_case,
            )
            .map_err(|e| source.error(line_no, e.to_string()))?;
            state.current_aspect = Some(
                DependencyRuleGroup::with_selector(pattern)
                    .adaptive_reordering(self.adaptive_reordering),
            );
            state.previous_left = Some(selector.to_string());
            return Ok(());
        }

        let macro_lines = state
            .defines
            .find_macro_use(line)
            .map(|(left, rule_macro, right)| rule_macro.expand(&left, &right));
        if let Some(lines) = macro_lines {
            for expanded in lines {
                self.parse_line(source, state, line_no, expanded.trim())?;
            }
            return Ok(());
        }

        if let Some((pos, arrow, kind)) = find_arrow(line) {
            return self.add_rule(source, state, line_no, line, pos, arrow, kind);
        }

        Err(source.error(line_no, format!("cannot parse line '{line}'")))
    }

    fn include(
        &mut self,
        source: &Source<'_>,
        state: &mut State,
        line_no: usize,
        path: &str,
    ) -> Result<(), RuleSetError> {
        if path.is_empty() {
            return Err(source.error(line_no, "include without a file name"));
        }
        let path = match source.dir {
            Some(dir) => dir.join(path),
            None => PathBuf::from(path),
        };
        let saved = (
            state.using_type.clone(),
            state.used_type.clone(),
            state.previous_left.take(),
        );
        self.read_file(&path, state, line_no, source.name)?;
        (state.using_type, state.used_type, state.previous_left) = saved;
        Ok(())
    }

    fn declare_types(
        &mut self,
        source: &Source<'_>,
        state: &mut State,
        line_no: usize,
        decl: &str,
    ) -> Result<(), RuleSetError> {
        let Some((using, used)) = decl.split_once(MAY_USE) else {
            return Err(source.error(line_no, format!("expected $ TYPE {MAY_USE} TYPE")));
        };
        state.using_type = Some(self.item_type(source, line_no, using.trim())?);
        state.used_type = Some(self.item_type(source, line_no, used.trim())?);
        Ok(())
    }

    fn item_type(
        &mut self,
        source: &Source<'_>,
        line_no: usize,
        text: &str,
    ) -> Result<ItemType, RuleSetError> {
        if text.contains('(') {
            self.types
                .declare(text)
                .map_err(|e| source.error(line_no, e.to_string()))
        } else {
            self.types
                .find(text)
                .ok_or_else(|| source.error(line_no, format!("unknown item type '{text}'")))
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn add_rule(
        &mut self,
        source: &Source<'_>,
        state: &mut State,
        line_no: usize,
        line: &str,
        pos: usize,
        arrow: &str,
        kind: RuleKind,
    ) -> Result<(), RuleSetError> {
        let (Some(using_type), Some(used_type)) = (state.using_type.clone(), state.used_type.clone())
        else {
            return Err(source.error(line_no, MISSING_TYPES));
        };
        let left = line[..pos].trim();
        let right = line[pos + arrow.len()..].trim();
        let left = if left.is_empty() {
            state.previous_left.clone().ok_or_else(|| {
                source.error(line_no, "rule without left side and no previous rule")
            })?
        } else {
            left.to_string()
        };
        if right.is_empty() {
            return Err(source.error(line_no, "rule without right side"));
        }
        state.previous_left = Some(left.clone());

        let representation = Arc::new(RuleRepresentation {
            source: source.name.to_string(),
            line: line_no,
            text: line.to_string(),
            questionable: kind == RuleKind::Questionable,
        });
        let rule = DependencyRule::new(
            Some(&using_type),
            &state.defines.expand(&left),
            Some(&used_type),
            &state.defines.expand(right),
            Arc::clone(&representation),
            self.ignore_case,
        )
        .map_err(|e| source.error(line_no, e.to_string()))?;
        debug!(
            rule = %representation,
            using = %rule.using(),
            used = %rule.used(),
            "Compiled rule"
        );

        let group = state.current_aspect.as_mut().unwrap_or(&mut state.global);
        if arrow == MAY_USE_RECURSIVE {
            let derived = derive_recursive(group, &rule, &representation, self.ignore_case);
            group.add(kind, rule);
            for d in derived {
                group.add(RuleKind::Allowed, d);
            }
        } else {
            group.add(kind, rule);
        }
        Ok(())
    }
}

fn find_arrow(line: &str) -> Option<(usize, &'static str, RuleKind)> {
    ARROWS
        .iter()
        .filter_map(|&(arrow, kind)| line.find(arrow).map(|pos| (pos, arrow, kind)))
        .min_by_key(|&(pos, ..)| pos)
}

/// Rules derived from a new recursive rule `U ---+> V`: for every allowed
/// rule `V ---> B` already in the group, a rule `U ---> B`. Only existing
/// rules are followed, once; patterns are compared by their text.
fn derive_recursive(
    group: &DependencyRuleGroup,
    rule: &DependencyRule,
    representation: &Arc<RuleRepresentation>,
    ignore_case: bool,
) -> Vec<DependencyRule> {
    let mut derived = Vec::new();
    for tail in group
        .rules(RuleKind::Allowed)
        .iter()
        .filter(|r| r.using().raw() == rule.used().raw())
    {
        match rule.chain(tail, Arc::clone(representation), ignore_case) {
            Ok(new_rule) => {
                debug!(
                    rule = %representation,
                    using = %new_rule.using(),
                    used = %new_rule.used(),
                    "Derived rule"
                );
                derived.push(new_rule);
            }
            Err(e) => warn!(rule = %representation, error = %e, "Skipping derived rule"),
        }
    }
    derived
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dependency, Registry};
    use crate::types::Classification;

    const SIMPLE_RULES: &str = "$ SIMPLE ---> SIMPLE\n";

    fn parse(registry: &mut Registry, text: &str) -> RuleSet {
        RuleSetParser::new(registry.types_mut())
            .parse_str("test.deprules", text)
            .unwrap()
    }

    fn classify(registry: &mut Registry, rules: &mut RuleSet, using: &str, used: &str) -> Classification {
        let t = registry.types().simple();
        let d = Dependency::new(
            registry.item(&t, &[using], false).unwrap(),
            registry.item(&t, &[used], false).unwrap(),
            1,
        );
        rules
            .groups_mut()
            .iter_mut()
            .filter(|g| g.applies_to(&d))
            .map(|g| g.classify(&d))
            .max()
            .unwrap_or(Classification::Ok)
    }

    #[test]
    fn arrows_select_rule_kinds() {
        let mut registry = Registry::new();
        let mut rules = parse(
            &mut registry,
            "// comment\n# comment\n\n$ SIMPLE ---> SIMPLE\na.** ---> b.**\na.** ---? c.**\na.** ---! b.secret\n",
        );
        assert_eq!(rules.rule_count(), 3);
        assert_eq!(classify(&mut registry, &mut rules, "a.x", "b.y"), Classification::Ok);
        assert_eq!(classify(&mut registry, &mut rules, "a.x", "c.y"), Classification::Questionable);
        assert_eq!(classify(&mut registry, &mut rules, "a.x", "b.secret"), Classification::Bad);
        assert_eq!(classify(&mut registry, &mut rules, "a.x", "d"), Classification::Bad);
    }

    #[test]
    fn empty_left_side_reuses_previous() {
        let mut registry = Registry::new();
        let mut rules = parse(&mut registry, "$ SIMPLE ---> SIMPLE\na.* ---> b\n    ---> c\n");
        assert_eq!(classify(&mut registry, &mut rules, "a.x", "c"), Classification::Ok);
        let err = RuleSetParser::new(registry.types_mut())
            .parse_str("r", "$ SIMPLE ---> SIMPLE\n---> c")
            .unwrap_err();
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn abbreviations_are_expanded() {
        let mut registry = Registry::new();
        let mut rules = parse(
            &mut registry,
            "$ SIMPLE ---> SIMPLE\nCORE := app.core.**\nUI := app.ui.**\nUI ---> CORE\n",
        );
        assert_eq!(rules.defines().abbreviation("CORE"), Some("app.core.**"));
        assert_eq!(classify(&mut registry, &mut rules, "app.ui.x", "app.core.y"), Classification::Ok);
        assert_eq!(rules.groups()[0].rules(RuleKind::Allowed)[0].representation().text, "UI ---> CORE");
    }

    #[test]
    fn macros_expand_to_rules() {
        let mut registry = Registry::new();
        let text = "$ SIMPLE ---> SIMPLE\n===> :=\n  \\L ---> \\R\n  \\R ---! \\L\n=:\na ===> b\n";
        let mut rules = parse(&mut registry, text);
        assert_eq!(rules.rule_count(), 2);
        assert_eq!(classify(&mut registry, &mut rules, "a", "b"), Classification::Ok);
        assert_eq!(classify(&mut registry, &mut rules, "b", "a"), Classification::Bad);
    }

    #[test]
    fn unclosed_macro_is_an_error() {
        let mut registry = Registry::new();
        let err = RuleSetParser::new(registry.types_mut())
            .parse_str("r", "$ SIMPLE ---> SIMPLE\na ---> b\n===> :=\n\\L ---> \\R\n")
            .unwrap_err();
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn aspect_groups_select_using_items() {
        let mut registry = Registry::new();
        let text = "$ SIMPLE ---> SIMPLE\n** ---> **\napp.ui.** {\n  ---> app.core.**\n}\n";
        let mut rules = parse(&mut registry, text);
        assert_eq!(rules.groups().len(), 2);
        assert_eq!(rules.groups()[1].selector_text(), "app.ui.**");
        assert_eq!(classify(&mut registry, &mut rules, "app.ui.x", "app.core.y"), Classification::Ok);
        assert_eq!(classify(&mut registry, &mut rules, "app.ui.x", "db.y"), Classification::Bad);
        assert_eq!(classify(&mut registry, &mut rules, "other", "db.y"), Classification::Ok);
    }

    #[test]
    fn aspect_groups_with_equal_selector_are_combined() {
        let mut registry = Registry::new();
        let text = "$ SIMPLE ---> SIMPLE\na.** {\n ---> b\n}\na.** {\n ---> b\n ---> c\n}\n";
        let rules = parse(&mut registry, text);
        assert_eq!(rules.groups().len(), 2);
        assert_eq!(rules.groups()[1].rules(RuleKind::Allowed).len(), 3);
    }

    #[test]
    fn unclosed_aspect_group_is_an_error() {
        let mut registry = Registry::new();
        let err = RuleSetParser::new(registry.types_mut())
            .parse_str("r", "$ SIMPLE ---> SIMPLE\na ---> b\nb.** {\n ---> c\n")
            .unwrap_err();
        assert!(err.to_string().contains("not closed"));
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn type_declarations_apply_to_following_rules() {
        let mut registry = Registry::new();
        let text = "$ T(Namespace:Class) ---> T\n(**):* ---> \\1.**\n";
        let rules = parse(&mut registry, text);
        let t = registry.types().find("T").unwrap();
        let rule = &rules.groups()[0].rules(RuleKind::Allowed)[0];
        assert_eq!(rule.using().item_type(), Some(&t));
        let own = Dependency::new(
            registry.item(&t, &["a.b", "C"], false).unwrap(),
            registry.item(&t, &["a.b.c", "D"], false).unwrap(),
            1,
        );
        assert!(rule.matches(&own));
    }

    #[test]
    fn unknown_type_is_an_error() {
        let mut registry = Registry::new();
        let err = RuleSetParser::new(registry.types_mut())
            .parse_str("r", "$ NOPE ---> NOPE")
            .unwrap_err();
        assert!(err.to_string().contains("unknown item type 'NOPE'"));
    }

    #[test]
    fn invalid_line_reports_location() {
        let mut registry = Registry::new();
        let err = RuleSetParser::new(registry.types_mut())
            .parse_str("r", "$ SIMPLE ---> SIMPLE\na ---> b\nwhat is this\n")
            .unwrap_err();
        assert_eq!(err.to_string(), "r:3: cannot parse line 'what is this'");
    }

    #[test]
    fn recursive_rule_follows_existing_allowed_rules_forward() {
        let mut registry = Registry::new();
        let text = format!("{SIMPLE_RULES}a ---> b\nc ---> d\nb ---+> c\n");
        let mut rules = parse(&mut registry, &text);
        // only b ---> d is derived
        assert_eq!(rules.groups()[0].rules(RuleKind::Allowed).len(), 4);
        assert_eq!(classify(&mut registry, &mut rules, "b", "d"), Classification::Ok);
        assert_eq!(classify(&mut registry, &mut rules, "a", "c"), Classification::Bad);
        assert_eq!(classify(&mut registry, &mut rules, "a", "d"), Classification::Bad);
    }

    #[test]
    fn recursive_rule_does_not_extend_rules_leading_to_it() {
        let mut registry = Registry::new();
        let text = format!("{SIMPLE_RULES}a ---> u\nu ---+> v\n");
        let mut rules = parse(&mut registry, &text);
        assert_eq!(classify(&mut registry, &mut rules, "u", "v"), Classification::Ok);
        assert_eq!(classify(&mut registry, &mut rules, "a", "v"), Classification::Bad);
    }

    #[test]
    fn recursive_rule_takes_a_single_step() {
        let mut registry = Registry::new();
        let text = format!("{SIMPLE_RULES}a ---> b\nb ---> c\nx ---+> a\n");
        let mut rules = parse(&mut registry, &text);
        assert_eq!(classify(&mut registry, &mut rules, "x", "b"), Classification::Ok);
        assert_eq!(classify(&mut registry, &mut rules, "x", "c"), Classification::Bad);

        let text = format!("{SIMPLE_RULES}b ---> c\nx ---+> b\n");
        let mut rules = parse(&mut registry, &text);
        assert_eq!(classify(&mut registry, &mut rules, "x", "c"), Classification::Ok);
    }

    #[test]
    fn rules_need_item_types() {
        let mut registry = Registry::new();
        let err = RuleSetParser::new(registry.types_mut())
            .parse_str("r", "// no types yet\na ---> b\n")
            .unwrap_err();
        assert_eq!(err.line(), Some(2));
        assert!(err.to_string().contains("$ line is missing"));

        let err = RuleSetParser::new(registry.types_mut())
            .parse_str("r", "a.** {\n ---> b\n}\n")
            .unwrap_err();
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn includes_are_relative_to_the_including_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("main.deprules"), "$ SIMPLE ---> SIMPLE\n+ sub/common.deprules\na ---> b\n").unwrap();
        std::fs::write(dir.path().join("sub/common.deprules"), "COMMON := x.**\n** ---> COMMON\n").unwrap();

        let mut registry = Registry::new();
        let rules = RuleSetParser::new(registry.types_mut())
            .parse_file(&dir.path().join("main.deprules"))
            .unwrap();
        assert_eq!(rules.rule_count(), 2);
        assert_eq!(rules.defines().abbreviation("COMMON"), Some("x.**"));
    }

    #[test]
    fn include_cycles_are_detected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.deprules"), "+ b.deprules\n").unwrap();
        std::fs::write(dir.path().join("b.deprules"), "+ a.deprules\n").unwrap();

        let mut registry = Registry::new();
        let err = RuleSetParser::new(registry.types_mut())
            .parse_file(&dir.path().join("a.deprules"))
            .unwrap_err();
        assert!(matches!(err, RuleSetError::IncludeCycle { line: 1, .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut registry = Registry::new();
        let err = RuleSetParser::new(registry.types_mut())
            .parse_file(Path::new("/nonexistent/rules.deprules"))
            .unwrap_err();
        assert!(matches!(err, RuleSetError::Io { .. }));
    }
}
