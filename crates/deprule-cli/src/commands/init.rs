//! Init command implementation.

use anyhow::{bail, Context, Result};
use std::path::Path;

const CONFIG_FILE: &str = "deprule.toml";
const RULES_FILE: &str = "main.deprules";

const DEFAULT_CONFIG: &str = r#"# deprule configuration

# Rule files to load, glob patterns relative to this file
rule_files = ["*.deprules"]

# Match patterns case-insensitively
ignore_case = false

# Reorder rules by hit count while checking
adaptive_reordering = true

# Lowest classification that fails `deprule check`: "bad" or "questionable"
fail_on = "bad"

# Markers used by `deprule mark` and `deprule mark-items`
[marking]
self_cycle_marker = "_self_cycle"
transitive_marker = "_transitive"
source_marker = "_source"
sink_marker = "_sink"
"#;

const DEFAULT_RULES: &str = r"// deprule rules
//
//   $ TYPE ---> TYPE        item types of the following rules
//   NAME := pattern         abbreviation
//   using ---> used         allowed
//   using ---? used         questionable
//   using ---! used         forbidden
//   using ---+> used        allowed, plus using ---> B for each used ---> B
//   selector {              rules only for matching using items
//       ---> used
//   }

// Replace SIMPLE with the item type of your dependencies,
// e.g. $ DOTNET(Namespace:Class) ---> DOTNET
$ SIMPLE ---> SIMPLE

** ---> **
";

/// Runs the init command in `dir`.
pub fn run(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE);
    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }
    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Created {CONFIG_FILE}");

    let rules_path = dir.join(RULES_FILE);
    if !rules_path.exists() {
        std::fs::write(&rules_path, DEFAULT_RULES)
            .with_context(|| format!("Failed to write {}", rules_path.display()))?;
        println!("Created {RULES_FILE}");
    }

    println!("\nNext steps:");
    println!("  1. Edit {RULES_FILE} to describe the allowed dependencies");
    println!("  2. Run: deprule check <dependencies.dip>");

    Ok(())
}
