//! Mark and mark-items command implementations.

use anyhow::{Context, Result};
use clap::Args;
use deprule_core::marking::{mark_self_cycles, mark_transitive, reset_counts};
use deprule_core::{
    Config, Dependency, DependencyFilter, Item, MarkDependencies, MarkerEdit, Registry,
    SpecialItemMarking,
};
use std::path::PathBuf;

use crate::config_resolver::ConfigSource;

/// Dependency selection shared by the marking commands.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Only dependencies matching one of these filters (`using -- markers -> used`)
    #[arg(short = 'm', long = "match")]
    pub matches: Vec<String>,

    /// Skip dependencies matching one of these filters
    #[arg(short = 'x', long)]
    pub exclude: Vec<String>,
}

impl FilterArgs {
    fn build(&self, registry: &Registry, ignore_case: bool) -> Result<DependencyFilter> {
        DependencyFilter::parse(&self.matches, &self.exclude, registry.types(), ignore_case)
            .context("Invalid dependency filter")
    }
}

/// Arguments of `deprule mark`.
#[derive(Args, Debug, Default)]
pub struct MarkArgs {
    /// DIP file to transform
    pub input: PathBuf,

    /// Output DIP file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Mark dependencies from an item to itself
    #[arg(long)]
    pub self_cycles: bool,

    /// Mark dependencies implied by a longer path
    #[arg(long)]
    pub transitive: bool,

    /// Marker for --self-cycles and --transitive (default from config)
    #[arg(long)]
    pub marker: Option<String>,

    /// Add a marker to the dependencies
    #[arg(long)]
    pub add: Vec<String>,

    /// Remove a marker from the dependencies
    #[arg(long)]
    pub remove: Vec<String>,

    /// Remove all markers from the dependencies
    #[arg(long)]
    pub clear: bool,

    /// Add a marker to the using items
    #[arg(long)]
    pub add_left: Vec<String>,

    /// Remove a marker from the using items
    #[arg(long)]
    pub remove_left: Vec<String>,

    /// Add a marker to the used items
    #[arg(long)]
    pub add_right: Vec<String>,

    /// Remove a marker from the used items
    #[arg(long)]
    pub remove_right: Vec<String>,

    /// Reset questionable counts to zero
    #[arg(long)]
    pub reset_questionable: bool,

    /// Reset bad counts to zero
    #[arg(long)]
    pub reset_bad: bool,

    /// Leave example infos out of the output
    #[arg(long)]
    pub no_example_info: bool,
}

impl MarkArgs {
    fn marker_edits(&self) -> MarkDependencies {
        fn edit(add: &[String], remove: &[String], clear: bool) -> MarkerEdit {
            let mut edit = MarkerEdit::new();
            if clear {
                edit = edit.clear();
            }
            for m in add {
                edit = edit.add(m);
            }
            for m in remove {
                edit = edit.remove(m);
            }
            edit
        }
        MarkDependencies::new()
            .dependency(edit(&self.add, &self.remove, self.clear))
            .left(edit(&self.add_left, &self.remove_left, false))
            .right(edit(&self.add_right, &self.remove_right, false))
    }

    fn has_edits(&self) -> bool {
        self.clear
            || [
                &self.add,
                &self.remove,
                &self.add_left,
                &self.remove_left,
                &self.add_right,
                &self.remove_right,
            ]
            .iter()
            .any(|v| !v.is_empty())
    }
}

/// Applies the requested transformations to `dependencies`. Returns the
/// number of transformations run.
fn apply(
    args: &MarkArgs,
    config: &Config,
    dependencies: &mut [Dependency],
    filter: &DependencyFilter,
) -> usize {
    let mut steps = 0;
    if args.self_cycles {
        let marker = args.marker.as_deref().unwrap_or(&config.marking.self_cycle_marker);
        let n = mark_self_cycles(dependencies, filter, marker);
        tracing::info!("Marked {n} self-cycles with '{marker}'");
        steps += 1;
    }
    if args.transitive {
        let marker = args.marker.as_deref().unwrap_or(&config.marking.transitive_marker);
        let n = mark_transitive(dependencies, filter, marker);
        tracing::info!("Marked {n} transitive dependencies with '{marker}'");
        steps += 1;
    }
    if args.has_edits() {
        args.marker_edits().apply(dependencies, filter);
        steps += 1;
    }
    if args.reset_questionable || args.reset_bad {
        reset_counts(dependencies, filter, args.reset_questionable, args.reset_bad);
        steps += 1;
    }
    steps
}

/// Runs the mark command.
pub fn run(args: MarkArgs, source: &ConfigSource) -> Result<()> {
    let config = super::load_config(source)?;
    let mut registry = Registry::with_ignore_case(config.ignore_case);
    let mut dependencies = super::read_inputs(std::slice::from_ref(&args.input), &mut registry)?;
    let filter = args.filter.build(&registry, config.ignore_case)?;

    if apply(&args, &config, &mut dependencies, &filter) == 0 {
        tracing::warn!("Nothing to do; writing dependencies unchanged");
    }

    super::write_dependencies(&dependencies, args.output.as_deref(), !args.no_example_info)
}

/// Which items `deprule mark-items` marks.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum ItemKind {
    /// Items without incoming dependencies.
    Sources,
    /// Items without outgoing dependencies.
    Sinks,
}

/// Arguments of `deprule mark-items`.
#[derive(Args, Debug)]
pub struct MarkItemsArgs {
    /// Items to mark
    pub kind: ItemKind,

    /// DIP file with the dependencies
    pub input: PathBuf,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Also mark items whose neighbors are all marked
    #[arg(short, long)]
    pub recursive: bool,

    /// Do not count dependencies from an item to itself
    #[arg(long)]
    pub ignore_self_cycles: bool,

    /// Marker to add (default from config)
    #[arg(long)]
    pub marker: Option<String>,
}

fn mark_items(
    args: &MarkItemsArgs,
    config: &Config,
    dependencies: &[Dependency],
    filter: &DependencyFilter,
) -> Vec<Item> {
    let marker = args.marker.clone().unwrap_or_else(|| match args.kind {
        ItemKind::Sources => config.marking.source_marker.clone(),
        ItemKind::Sinks => config.marking.sink_marker.clone(),
    });
    let marking = SpecialItemMarking::new(marker)
        .recursive(args.recursive)
        .ignore_self_cycles(args.ignore_self_cycles);
    match args.kind {
        ItemKind::Sources => marking.mark_sources(dependencies, filter),
        ItemKind::Sinks => marking.mark_sinks(dependencies, filter),
    }
}

/// Runs the mark-items command: prints each marked item on its own line.
pub fn run_items(args: MarkItemsArgs, source: &ConfigSource) -> Result<()> {
    let config = super::load_config(source)?;
    let mut registry = Registry::with_ignore_case(config.ignore_case);
    let dependencies = super::read_inputs(std::slice::from_ref(&args.input), &mut registry)?;
    let filter = args.filter.build(&registry, config.ignore_case)?;

    for item in mark_items(&args, &config, &dependencies, &filter) {
        println!("{}", item.as_full_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use deprule_core::read_dip;

    const CHAIN: &str = "\
SIMPLE:a => ;1;0;0;; => SIMPLE:b
SIMPLE:b => ;1;0;0;; => SIMPLE:c
SIMPLE:a => ;1;2;1;; => SIMPLE:c
SIMPLE:c => ;1;0;0;; => SIMPLE:c
";

    fn load(registry: &mut Registry) -> Vec<Dependency> {
        read_dip(CHAIN, "chain.dip", registry).unwrap()
    }

    #[test]
    fn default_markers_come_from_config() {
        let mut registry = Registry::new();
        let mut deps = load(&mut registry);
        let args = MarkArgs {
            self_cycles: true,
            transitive: true,
            ..MarkArgs::default()
        };
        let config = Config::default();
        let steps = apply(&args, &config, &mut deps, &DependencyFilter::all());

        assert_eq!(steps, 2);
        assert!(deps[3].markers().contains("_self_cycle"));
        assert!(deps[2].markers().contains("_transitive"));
        assert!(deps[0].markers().is_empty());
    }

    #[test]
    fn edits_and_resets_apply_to_filtered_dependencies() {
        let mut registry = Registry::new();
        let mut deps = load(&mut registry);
        let args = MarkArgs {
            filter: FilterArgs {
                matches: vec!["a --->".to_string()],
                exclude: vec!["---> b".to_string()],
            },
            add: vec!["reviewed".to_string()],
            add_right: vec!["target".to_string()],
            reset_bad: true,
            ..MarkArgs::default()
        };
        let filter = args.filter.build(&registry, false).unwrap();
        assert_eq!(apply(&args, &Config::default(), &mut deps, &filter), 2);

        assert_eq!(deps[2].markers().to_string(), "reviewed");
        assert_eq!((deps[2].questionable_ct(), deps[2].bad_ct()), (2, 0));
        assert!(deps[0].markers().is_empty());
        assert!(deps[2].used().has_marker("target"));
        assert!(!deps[0].used().has_marker("target"));
    }

    #[test]
    fn no_flags_change_nothing() {
        let mut registry = Registry::new();
        let mut deps = load(&mut registry);
        assert_eq!(apply(&MarkArgs::default(), &Config::default(), &mut deps, &DependencyFilter::all()), 0);
        assert!(deps.iter().all(|d| d.markers().is_empty()));
    }

    #[test]
    fn sinks_ignoring_self_cycles() {
        let mut registry = Registry::new();
        let deps = load(&mut registry);
        let args = MarkItemsArgs {
            kind: ItemKind::Sinks,
            input: PathBuf::from("chain.dip"),
            filter: FilterArgs::default(),
            recursive: true,
            ignore_self_cycles: true,
            marker: None,
        };
        let items = mark_items(&args, &Config::default(), &deps, &DependencyFilter::all());
        let names: Vec<&str> = items.iter().map(Item::as_string).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert!(items[0].has_marker("_sink"));
    }

    #[test]
    fn sources_with_explicit_marker() {
        let mut registry = Registry::new();
        let deps = load(&mut registry);
        let args = MarkItemsArgs {
            kind: ItemKind::Sources,
            input: PathBuf::from("chain.dip"),
            filter: FilterArgs::default(),
            recursive: false,
            ignore_self_cycles: false,
            marker: Some("entry".to_string()),
        };
        let items = mark_items(&args, &Config::default(), &deps, &DependencyFilter::all());
        assert_eq!(items.len(), 1);
        assert!(items[0].has_marker("entry"));
    }
}
