//! # deprule-core
//!
//! Rule-based checking of item dependency graphs.
//!
//! Dependencies are directed, counted edges between typed items. Rule files
//! say which items may, should not, or must not use which others; the checker
//! classifies every dependency as ok, questionable or bad. This crate
//! provides:
//!
//! - [`Registry`] for interning item types and items
//! - [`ItemPattern`] and [`DependencyMatch`] for selecting items and edges
//! - [`RuleSetParser`] and [`DependencyRuleGroup`] for rule files
//! - [`Checker`] for classifying dependency sets
//! - marking transformations for cycles, transitive edges, sources and sinks
//! - the DIP text format for reading and writing dependency sets
//!
//! ## Example
//!
//! ```ignore
//! use deprule_core::{read_dip_file, Checker, Registry};
//!
//! let mut registry = Registry::new();
//! let mut dependencies = read_dip_file("deps.dip".as_ref(), &mut registry)?;
//!
//! let mut checker = Checker::builder()
//!     .rule_file("layers.deprules")
//!     .build(&mut registry)?;
//!
//! let report = checker.check(&mut dependencies);
//! println!("{}", report.summary());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod checker;
mod config;
mod dip;
mod types;

/// Dependency marking transformations.
pub mod marking;
/// Items, item types and dependencies.
pub mod model;
/// Item and dependency patterns.
pub mod pattern;
/// Rule files and rule groups.
pub mod rules;

pub use checker::{Checker, CheckerBuilder, CheckerError};
pub use config::{Config, ConfigError, MarkingConfig};
pub use dip::{read_dip, read_dip_file, to_dip_string, write_dip_file, DipError};
pub use marking::{DependencyFilter, MarkDependencies, MarkerEdit, SpecialItemMarking};
pub use model::{Dependency, Item, ItemType, ModelError, Registry, SourceLocation};
pub use pattern::{DependencyMatch, ItemPattern, PatternError};
pub use rules::{DependencyRule, DependencyRuleGroup, RuleSet, RuleSetError, RuleSetParser};
pub use types::{format_violations, CheckReport, Classification, FailOn, RuleViolation};
