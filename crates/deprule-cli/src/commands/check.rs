//! Check command implementation.

use anyhow::{Context, Result};
use clap::Args;
use deprule_core::{Checker, FailOn, Registry};
use std::path::PathBuf;

use crate::config_resolver::ConfigSource;
use crate::OutputFormat;

/// Arguments of `deprule check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// DIP files with the dependencies to check
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Rule files, in addition to those of the configuration
    #[arg(short, long = "rules")]
    pub rules: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Write the checked dependencies, with their new counts, to this DIP file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Lowest classification that fails the check
    #[arg(long)]
    pub fail_on: Option<FailOnArg>,

    /// Match patterns case-insensitively
    #[arg(short, long)]
    pub ignore_case: bool,

    /// Keep rules in file order instead of reordering by hit count
    #[arg(long)]
    pub no_reorder: bool,
}

/// Failure threshold on the command line.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum FailOnArg {
    /// Fail on bad dependencies.
    Bad,
    /// Fail on questionable or bad dependencies.
    Questionable,
}

impl From<FailOnArg> for FailOn {
    fn from(arg: FailOnArg) -> Self {
        match arg {
            FailOnArg::Bad => FailOn::Bad,
            FailOnArg::Questionable => FailOn::Questionable,
        }
    }
}

/// Runs the check command.
pub fn run(args: CheckArgs, source: &ConfigSource) -> Result<()> {
    let config = super::load_config(source)?;
    let ignore_case = args.ignore_case || config.ignore_case;

    let mut registry = Registry::with_ignore_case(ignore_case);
    let mut dependencies = super::read_inputs(&args.inputs, &mut registry)?;

    let mut builder = Checker::builder()
        .rule_files(args.rules)
        .config(config)
        .ignore_case(ignore_case);
    if args.no_reorder {
        builder = builder.adaptive_reordering(false);
    }
    if let Some(fail_on) = args.fail_on {
        builder = builder.fail_on(fail_on.into());
    }

    let mut checker = builder
        .build(&mut registry)
        .context("Failed to load rules")?;
    super::output::print_rule_errors(checker.rule_errors());
    if checker.rule_count() == 0 {
        tracing::warn!("No rules loaded; every dependency will be bad");
    }

    tracing::info!(
        "Checking {} dependencies with {} rules",
        dependencies.len(),
        checker.rule_count()
    );
    let report = checker.check(&mut dependencies);

    super::output::print(&report, &dependencies, args.format)?;

    if let Some(output) = &args.output {
        super::write_dependencies(&dependencies, Some(output), true)?;
    }

    if checker.fails(&report) {
        std::process::exit(1);
    }

    Ok(())
}
