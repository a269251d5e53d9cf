//! deprule CLI tool.
//!
//! Usage:
//! ```bash
//! deprule check [OPTIONS] --rules <FILE> <DIP>...
//! deprule mark [OPTIONS] <DIP>
//! deprule mark-items [OPTIONS] <KIND> <DIP>
//! deprule init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Checks item dependency graphs against dependency rules
#[derive(Parser)]
#[command(name = "deprule")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "DEPRULE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify dependencies with rule files
    Check(commands::check::CheckArgs),

    /// Mark or reset dependencies in a DIP file
    Mark(commands::mark::MarkArgs),

    /// Mark and list source or sink items
    MarkItems(commands::mark::MarkItemsArgs),

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Output format for check results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-violation compact format.
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let source = config_resolver::resolve(Path::new("."), cli.config.as_deref());
    tracing::debug!("Using {source}");

    match cli.command {
        Commands::Check(args) => commands::check::run(args, &source),
        Commands::Mark(args) => commands::mark::run(args, &source),
        Commands::MarkItems(args) => commands::mark::run_items(args, &source),
        Commands::Init { force } => commands::init::run(Path::new("."), force),
    }
}
