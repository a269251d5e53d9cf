//! The DIP text format for dependency sets.
//!
//! ```text
//! // Written by deprule
//!
//! // ITEMTYPE DOTNET
//! DOTNET Namespace Class Assembly.Name
//!
//! DOTNET:A:X:a => use;3;0;1;src/x.cs:12;A:X ---! B:Y => DOTNET:B:Y:b
//! ```
//!
//! Each dependency line is `using => markers;ct;questionable;bad;source;example => used`,
//! items in the `TYPE[;order]:values` form. Item types are declared before
//! their first use; `GENERIC_n` declarations read back as generic types.
//!
//! Item markers and the inner flag are not part of the format: items are
//! read as not inner and without markers.

use crate::model::{Dependency, Item, ModelError, Registry, SourceLocation, DIP_ARROW};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors reading or writing DIP files.
#[derive(Debug, Error)]
pub enum DipError {
    /// IO error.
    #[error("cannot access {path}: {source}")]
    Io {
        /// The file.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A line is malformed.
    #[error("line {line}: {message}")]
    Parse {
        /// Line number (1-indexed).
        line: usize,
        /// What is wrong.
        message: String,
    },

    /// An item or type does not fit its declaration.
    #[error("line {line}: {source}")]
    Model {
        /// Line number (1-indexed).
        line: usize,
        /// Underlying model error.
        source: ModelError,
    },
}

/// Renders dependencies as DIP text. Example infos are written only if
/// `with_example_info` is set.
#[must_use]
pub fn to_dip_string(dependencies: &[Dependency], with_example_info: bool) -> String {
    let mut out = String::new();
    let mut written: HashSet<&str> = HashSet::new();
    let _ = writeln!(out, "// Written by deprule");
    let _ = writeln!(out);
    for d in dependencies {
        for item_type in [d.using().item_type(), d.used().item_type()] {
            if written.insert(item_type.name()) {
                let _ = writeln!(out, "// ITEMTYPE {}", item_type.name());
                let _ = writeln!(out, "{}", item_type.declaration());
                let _ = writeln!(out);
            }
        }
        let _ = writeln!(out, "{}", d.as_dip_line(with_example_info));
    }
    out
}

/// Writes dependencies to a DIP file.
///
/// # Errors
///
/// Returns [`DipError::Io`] if the file cannot be written.
pub fn write_dip_file(
    path: &Path,
    dependencies: &[Dependency],
    with_example_info: bool,
) -> Result<(), DipError> {
    std::fs::write(path, to_dip_string(dependencies, with_example_info)).map_err(|source| {
        DipError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Reads DIP text, interning items in `registry`. Types declared in the text
/// are registered; items of undeclared types get a generic type of their
/// field count. `input` names the batch the dependencies came from.
///
/// # Errors
///
/// Returns an error for a malformed line or a conflicting type declaration.
pub fn read_dip(
    text: &str,
    input: &str,
    registry: &mut Registry,
) -> Result<Vec<Dependency>, DipError> {
    let input: Arc<str> = Arc::from(input);
    let mut dependencies = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") || line.starts_with('#') {
            continue;
        }
        let model = |source| DipError::Model {
            line: line_no,
            source,
        };

        let Some((using, rest)) = line.split_once(DIP_ARROW) else {
            registry.types_mut().declare(line).map_err(model)?;
            continue;
        };
        let Some((middle, used)) = rest.rsplit_once(DIP_ARROW) else {
            return Err(parse_error(line_no, "expected using => properties => used"));
        };

        let using = read_item(registry, using.trim(), line_no)?;
        let used = read_item(registry, used.trim(), line_no)?;

        let mut fields = middle.trim().splitn(6, ';');
        let markers = fields.next().unwrap_or_default();
        let mut count = |name: &str| -> Result<u32, DipError> {
            let text = fields.next().unwrap_or_default().trim();
            if text.is_empty() {
                return Ok(0);
            }
            text.parse()
                .map_err(|_| parse_error(line_no, format!("invalid {name} count '{text}'")))
        };
        let ct = count("total")?;
        let questionable = count("questionable")?;
        let bad = count("bad")?;
        let source = fields.next().and_then(SourceLocation::parse);
        let example = fields.next().map(str::trim).filter(|e| !e.is_empty());

        let mut dependency = Dependency::new(using, used, ct)
            .with_marker_text(markers)
            .with_counts(questionable, bad)
            .with_input(Arc::clone(&input));
        if let Some(source) = source {
            dependency = dependency.with_source(source);
        }
        if let Some(example) = example {
            dependency = dependency.with_example_info(example);
        }
        dependencies.push(dependency);
    }
    Ok(dependencies)
}

/// Reads a DIP file; see [`read_dip`].
///
/// # Errors
///
/// Returns [`DipError::Io`] if the file cannot be read, or any error of
/// [`read_dip`].
pub fn read_dip_file(path: &Path, registry: &mut Registry) -> Result<Vec<Dependency>, DipError> {
    let text = std::fs::read_to_string(path).map_err(|source| DipError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_dip(&text, &path.display().to_string(), registry)
}

fn parse_error(line: usize, message: impl Into<String>) -> DipError {
    DipError::Parse {
        line,
        message: message.into(),
    }
}

fn read_item(registry: &mut Registry, text: &str, line: usize) -> Result<Item, DipError> {
    let Some((head, values)) = text.split_once(':') else {
        return Err(parse_error(line, format!("item '{text}' has no type")));
    };
    let (type_name, order) = match head.split_once(';') {
        Some((name, order)) => (name.trim(), Some(order.trim())),
        None => (head.trim(), None),
    };
    let values: Vec<&str> = values.split([':', ';']).collect();
    let item_type = match registry.types().find(type_name) {
        Some(t) if t.len() == values.len() => t,
        _ => registry
            .types_mut()
            .generic(values.len())
            .map_err(|source| DipError::Model { line, source })?,
    };
    let item = registry
        .item(&item_type, &values, false)
        .map_err(|source| DipError::Model { line, source })?;
    if let Some(order) = order.filter(|o| !o.is_empty()) {
        item.set_order(Some(order.to_string()));
    }
    Ok(item)
}
