//! Configuration types for deprule.

use crate::types::FailOn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for deprule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Match patterns and markers case-insensitively.
    #[serde(default)]
    pub ignore_case: bool,

    /// Reorder rules by hit count while checking (default: true).
    #[serde(default = "default_true")]
    pub adaptive_reordering: bool,

    /// Glob patterns of rule files, relative to the config file.
    #[serde(default)]
    pub rule_files: Vec<String>,

    /// Lowest classification that fails a check (default: "bad").
    #[serde(default)]
    pub fail_on: FailOn,

    /// Default markers of the marking commands.
    #[serde(default)]
    pub marking: MarkingConfig,

    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignore_case: false,
            adaptive_reordering: true,
            rule_files: Vec::new(),
            fail_on: FailOn::default(),
            marking: MarkingConfig::default(),
            base_dir: None,
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file. Rule file patterns are resolved
    /// relative to the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config = Self::parse(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Sets the directory rule file patterns are resolved against.
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Directory rule file patterns are resolved against, if any.
    #[must_use]
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Expands `rule_files` into paths, sorted per pattern. A pattern
    /// matching nothing is kept as a path, so that reading it reports the
    /// missing file.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid glob pattern.
    pub fn rule_paths(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let mut paths = Vec::new();
        for pattern in &self.rule_files {
            let full = match &self.base_dir {
                Some(dir) if !Path::new(pattern).is_absolute() => dir.join(pattern),
                _ => PathBuf::from(pattern),
            };
            let full_text = full.to_string_lossy().into_owned();
            let mut matched: Vec<PathBuf> = glob::glob(&full_text)
                .map_err(|e| ConfigError::Glob {
                    pattern: pattern.clone(),
                    source: e,
                })?
                .filter_map(Result::ok)
                .collect();
            if matched.is_empty() {
                paths.push(full);
            } else {
                matched.sort();
                paths.extend(matched);
            }
        }
        Ok(paths)
    }
}

/// Default markers of the marking commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkingConfig {
    /// Marker for dependencies from an item to itself.
    #[serde(default = "default_self_cycle_marker")]
    pub self_cycle_marker: String,

    /// Marker for dependencies implied by longer paths.
    #[serde(default = "default_transitive_marker")]
    pub transitive_marker: String,

    /// Marker for items without incoming dependencies.
    #[serde(default = "default_source_marker")]
    pub source_marker: String,

    /// Marker for items without outgoing dependencies.
    #[serde(default = "default_sink_marker")]
    pub sink_marker: String,
}

impl Default for MarkingConfig {
    fn default() -> Self {
        Self {
            self_cycle_marker: default_self_cycle_marker(),
            transitive_marker: default_transitive_marker(),
            source_marker: default_source_marker(),
            sink_marker: default_sink_marker(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_self_cycle_marker() -> String {
    "_self_cycle".to_string()
}

fn default_transitive_marker() -> String {
    "_transitive".to_string()
}

fn default_source_marker() -> String {
    "_source".to_string()
}

fn default_sink_marker() -> String {
    "_sink".to_string()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// Invalid rule file pattern.
    #[error("Invalid rule file pattern {pattern}: {source}")]
    Glob {
        /// The pattern.
        pattern: String,
        /// Underlying glob error.
        source: glob::PatternError,
    },
}
