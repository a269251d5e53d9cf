//! Command implementations.

pub mod check;
pub mod init;
pub mod mark;
pub mod output;

use anyhow::{Context, Result};
use deprule_core::{read_dip_file, to_dip_string, Config, Dependency, Registry};
use std::path::{Path, PathBuf};

use crate::config_resolver::ConfigSource;

/// Loads the resolved configuration.
pub fn load_config(source: &ConfigSource) -> Result<Config> {
    let Some(path) = source.path() else {
        return Ok(Config::default());
    };
    tracing::info!("Using {source}");
    Config::from_file(path).with_context(|| format!("Failed to load config: {}", path.display()))
}

/// Reads DIP files into one dependency list.
pub fn read_inputs(inputs: &[PathBuf], registry: &mut Registry) -> Result<Vec<Dependency>> {
    let mut dependencies = Vec::new();
    for input in inputs {
        let read = read_dip_file(input, registry)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        tracing::debug!("Read {} dependencies from {}", read.len(), input.display());
        dependencies.extend(read);
    }
    Ok(dependencies)
}

/// Writes dependencies as DIP to `output`, or to stdout.
pub fn write_dependencies(
    dependencies: &[Dependency],
    output: Option<&Path>,
    with_example_info: bool,
) -> Result<()> {
    let text = to_dip_string(dependencies, with_example_info);
    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {} dependencies to {}", dependencies.len(), path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inputs_share_one_registry() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.dip");
        let b = dir.path().join("b.dip");
        std::fs::write(&a, "SIMPLE:x => ;1;0;0;; => SIMPLE:y\n").unwrap();
        std::fs::write(&b, "SIMPLE:y => ;2;0;0;; => SIMPLE:x\n").unwrap();

        let mut registry = Registry::new();
        let deps = read_inputs(&[a, b], &mut registry).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].using(), deps[1].used());
        assert_eq!(registry.items().len(), 2);
    }

    #[test]
    fn missing_input_names_the_file() {
        let mut registry = Registry::new();
        let err = read_inputs(&[PathBuf::from("/nonexistent/in.dip")], &mut registry).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/in.dip"));
    }

    #[test]
    fn default_source_gives_default_config() {
        let config = load_config(&ConfigSource::Default).unwrap();
        assert!(config.adaptive_reordering);
        assert!(config.rule_files.is_empty());
    }

    #[test]
    fn written_output_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.dip");
        let output = dir.path().join("out.dip");
        std::fs::write(&input, "SIMPLE:x => m;3;1;0;x.cs:1; => SIMPLE:y\n").unwrap();

        let mut registry = Registry::new();
        let deps = read_inputs(&[input], &mut registry).unwrap();
        write_dependencies(&deps, Some(&output), true).unwrap();
        let again = read_inputs(&[output], &mut registry).unwrap();
        assert_eq!(again[0].markers().to_string(), "m");
        assert_eq!(again[0].questionable_ct(), 1);
    }
}
